mod attribute_selection;

pub use attribute_selection::AttributeSelection;
