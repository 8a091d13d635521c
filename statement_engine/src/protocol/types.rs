/// Column type of a materialised result cell.
///
/// Cells travel as text bytes (the server's text protocol), the type only
/// tells readers how to interpret them.
#[repr(u16)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SqlType {
    Varchar = 1,
    Integer = 2,
    BigInt = 3,
    Decimal = 4,
    Date = 5,
    Timestamp = 6,
    Binary = 7,
}

impl SqlType {
    /// Maps an ODBC/JDBC `SQL_*` type code; unknown codes read as text.
    pub fn from_sql_type_code(sql_type: i16) -> Self {
        match sql_type {
            1 | 12 => Self::Varchar,
            4 | 5 | -6 | -7 => Self::Integer,
            -5 => Self::BigInt,
            2 | 3 => Self::Decimal,
            9 | 91 => Self::Date,
            11 | 93 => Self::Timestamp,
            -2 | -3 | -4 => Self::Binary,
            _ => Self::Varchar,
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Integer | Self::BigInt | Self::Decimal)
    }

    #[cfg(feature = "odbc")]
    pub fn from_data_type(data_type: &odbc_api::DataType) -> Self {
        use odbc_api::DataType;

        match data_type {
            DataType::Integer | DataType::SmallInt | DataType::TinyInt | DataType::Bit => {
                Self::Integer
            }
            DataType::BigInt => Self::BigInt,
            DataType::Numeric { .. } | DataType::Decimal { .. } => Self::Decimal,
            DataType::Date => Self::Date,
            DataType::Timestamp { .. } => Self::Timestamp,
            DataType::Binary { .. } | DataType::Varbinary { .. } | DataType::LongVarbinary { .. } => {
                Self::Binary
            }
            _ => Self::Varchar,
        }
    }
}
