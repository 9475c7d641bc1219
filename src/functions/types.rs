//! Type name parsing for cast/schema.

use polars::prelude::{DataType, PolarsError};

/// Parse a Spark type name (`float`, `string`, `bigint`, `array<string>`, ...) to a Polars DataType.
pub fn parse_type_name(name: &str) -> Result<DataType, PolarsError> {
    crate::schema::DataType::parse(name).map(|t| t.to_polars())
}

#[cfg(test)]
mod tests {
    use super::parse_type_name;
    use polars::prelude::{DataType, TimeUnit};

    #[test]
    fn spark_names_map_to_polars() {
        assert_eq!(parse_type_name("float").unwrap(), DataType::Float32);
        assert_eq!(parse_type_name(" BIGINT ").unwrap(), DataType::Int64);
        assert_eq!(
            parse_type_name("timestamp").unwrap(),
            DataType::Datetime(TimeUnit::Microseconds, None)
        );
        assert_eq!(
            parse_type_name("array<int>").unwrap(),
            DataType::List(Box::new(DataType::Int32))
        );
        assert!(parse_type_name("decimal").is_err());
    }
}
