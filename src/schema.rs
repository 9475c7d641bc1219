use polars::prelude::{DataType as PlDataType, PolarsError, Schema, TimeUnit};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DataType {
    String,
    Integer,
    Long,
    Float,
    Double,
    Boolean,
    Date,
    Timestamp,
    Array(Box<DataType>),
}

impl DataType {
    /// Parse a Spark type name (`string`, `int`, `bigint`, `double`, `array<string>`, ...).
    /// Matching is case-insensitive.
    pub fn parse(name: &str) -> Result<DataType, PolarsError> {
        let s = name.trim().to_lowercase();
        if let Some(inner) = s.strip_prefix("array<").and_then(|r| r.strip_suffix('>')) {
            return Ok(DataType::Array(Box::new(DataType::parse(inner)?)));
        }
        Ok(match s.as_str() {
            "string" | "str" | "varchar" => DataType::String,
            "int" | "integer" => DataType::Integer,
            "long" | "bigint" => DataType::Long,
            "float" | "real" => DataType::Float,
            "double" => DataType::Double,
            "boolean" | "bool" => DataType::Boolean,
            "date" => DataType::Date,
            "timestamp" => DataType::Timestamp,
            _ => {
                return Err(PolarsError::InvalidOperation(
                    format!("unknown type name: {name}").into(),
                ))
            }
        })
    }

    /// Spark simple string for this type (`string`, `bigint`, `array<string>`).
    pub fn simple_string(&self) -> String {
        match self {
            DataType::String => "string".to_string(),
            DataType::Integer => "int".to_string(),
            DataType::Long => "bigint".to_string(),
            DataType::Float => "float".to_string(),
            DataType::Double => "double".to_string(),
            DataType::Boolean => "boolean".to_string(),
            DataType::Date => "date".to_string(),
            DataType::Timestamp => "timestamp".to_string(),
            DataType::Array(inner) => format!("array<{}>", inner.simple_string()),
        }
    }

    pub fn to_polars(&self) -> PlDataType {
        data_type_to_polars_type(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructField {
    pub name: String,
    pub data_type: DataType,
    pub nullable: bool,
}

impl StructField {
    pub fn new(name: impl Into<String>, data_type: DataType, nullable: bool) -> Self {
        StructField {
            name: name.into(),
            data_type,
            nullable,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructType {
    fields: Vec<StructField>,
}

impl StructType {
    pub fn new(fields: Vec<StructField>) -> Self {
        StructType { fields }
    }

    /// Parse a DDL schema string: `"username string, books string"`.
    /// Accepts `name type` or `name: type` per field; type names are case-insensitive.
    /// Commas inside `array<...>` do not split fields.
    pub fn from_ddl(ddl: &str) -> Result<StructType, PolarsError> {
        let mut fields = Vec::new();
        for part in split_top_level(ddl) {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            let (name, type_name) = match part.split_once(':') {
                Some((n, t)) => (n.trim(), t.trim()),
                None => match part.split_once(char::is_whitespace) {
                    Some((n, t)) => (n.trim(), t.trim()),
                    None => {
                        return Err(PolarsError::InvalidOperation(
                            format!("schema: field '{part}' has no type (expected 'name type')")
                                .into(),
                        ))
                    }
                },
            };
            let name = name.trim_matches('`');
            fields.push(StructField::new(name, DataType::parse(type_name)?, true));
        }
        if fields.is_empty() {
            return Err(PolarsError::InvalidOperation(
                format!("schema: no fields in '{ddl}'").into(),
            ));
        }
        Ok(StructType { fields })
    }

    pub fn from_polars_schema(schema: &Schema) -> Self {
        let fields = schema
            .iter()
            .map(|(name, dtype)| StructField {
                name: name.to_string(),
                data_type: polars_type_to_data_type(dtype),
                nullable: true,
            })
            .collect();
        StructType { fields }
    }

    pub fn to_polars_schema(&self) -> Schema {
        use polars::prelude::Field;
        let fields: Vec<Field> = self
            .fields
            .iter()
            .map(|f| {
                Field::new(
                    f.name.as_str().into(),
                    data_type_to_polars_type(&f.data_type),
                )
            })
            .collect();
        Schema::from_iter(fields)
    }

    pub fn fields(&self) -> &[StructField] {
        &self.fields
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    /// Spark `simpleString`: `struct<username:string,books:string>`.
    pub fn simple_string(&self) -> String {
        let inner: Vec<String> = self
            .fields
            .iter()
            .map(|f| format!("{}:{}", f.name, f.data_type.simple_string()))
            .collect();
        format!("struct<{}>", inner.join(","))
    }

    /// Tree rendering in the style of `printSchema`.
    pub fn tree_string(&self) -> String {
        let mut out = String::from("root\n");
        for f in &self.fields {
            out.push_str(&format!(
                " |-- {}: {} (nullable = {})\n",
                f.name,
                f.data_type.simple_string(),
                f.nullable
            ));
        }
        out
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(s: &str) -> Result<StructType, serde_json::Error> {
        serde_json::from_str(s)
    }
}

fn split_top_level(ddl: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in ddl.char_indices() {
        match c {
            '<' | '(' => depth += 1,
            '>' | ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&ddl[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&ddl[start..]);
    parts
}

fn polars_type_to_data_type(polars_type: &PlDataType) -> DataType {
    match polars_type {
        PlDataType::String => DataType::String,
        PlDataType::Int8 | PlDataType::Int16 | PlDataType::Int32 => DataType::Integer,
        PlDataType::Int64 | PlDataType::UInt32 | PlDataType::UInt64 => DataType::Long,
        PlDataType::Float32 => DataType::Float,
        PlDataType::Float64 => DataType::Double,
        PlDataType::Boolean => DataType::Boolean,
        PlDataType::Date => DataType::Date,
        PlDataType::Datetime(_, _) => DataType::Timestamp,
        PlDataType::List(inner) => DataType::Array(Box::new(polars_type_to_data_type(inner))),
        _ => DataType::String,
    }
}

fn data_type_to_polars_type(data_type: &DataType) -> PlDataType {
    match data_type {
        DataType::String => PlDataType::String,
        DataType::Integer => PlDataType::Int32,
        DataType::Long => PlDataType::Int64,
        DataType::Float => PlDataType::Float32,
        DataType::Double => PlDataType::Float64,
        DataType::Boolean => PlDataType::Boolean,
        DataType::Date => PlDataType::Date,
        DataType::Timestamp => PlDataType::Datetime(TimeUnit::Microseconds, None),
        DataType::Array(inner) => PlDataType::List(Box::new(data_type_to_polars_type(inner))),
    }
}
