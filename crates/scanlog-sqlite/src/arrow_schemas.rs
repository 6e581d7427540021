use arrow::datatypes::{DataType, Field, Schema};

pub fn scans_schema() -> Schema {
    Schema::new(vec![
        Field::new("id", DataType::Int64, false),
        Field::new("type", DataType::Utf8, false),
        Field::new("input", DataType::Utf8, false),
        Field::new("result", DataType::Utf8, false),
        Field::new("confidence", DataType::Float64, false),
        Field::new("timestamp", DataType::Utf8, false),
    ])
}
