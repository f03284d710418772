//! Conversions between [`zqlz_core::Value`] and PostgreSQL wire values

use bytes::BytesMut;
use tokio_postgres::Row as PgRow;
use tokio_postgres::types::{FromSql, ToSql, Type};
use zqlz_core::{Result, Row, Value};

type BoxError = Box<dyn std::error::Error + Sync + Send>;

/// Owned parameter value handed to tokio-postgres.
///
/// Bound values are converted against the type the server declared for each
/// placeholder, so an `i64` bound to an `int4` argument is written as 4 bytes.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum PgValue {
    Null,
    Bool(bool),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    /// Decimal text, written in NUMERIC binary form when the target is NUMERIC
    Numeric(String),
    String(String),
    Bytes(Vec<u8>),
    Uuid(uuid::Uuid),
    Json(serde_json::Value),
    DateTimeUtc(chrono::DateTime<chrono::Utc>),
    Date(chrono::NaiveDate),
    Time(chrono::NaiveTime),
    DateTime(chrono::NaiveDateTime),
}

impl PgValue {
    pub(crate) fn from_value_for_type(value: &Value, target_type: &Type) -> Self {
        match value {
            Value::Null => PgValue::Null,
            Value::Bool(v) => PgValue::Bool(*v),

            Value::Int8(v) => Self::coerce_int(*v as i64, target_type),
            Value::Int16(v) => Self::coerce_int(*v as i64, target_type),
            Value::Int32(v) => Self::coerce_int(*v as i64, target_type),
            Value::Int64(v) => Self::coerce_int(*v, target_type),

            Value::Float32(v) => match *target_type {
                Type::FLOAT8 => PgValue::Float64(*v as f64),
                Type::NUMERIC => PgValue::Numeric(v.to_string()),
                _ => PgValue::Float32(*v),
            },
            Value::Float64(v) => match *target_type {
                Type::FLOAT4 => PgValue::Float32(*v as f32),
                Type::NUMERIC => PgValue::Numeric(v.to_string()),
                _ => PgValue::Float64(*v),
            },
            Value::Decimal(v) => PgValue::Numeric(v.clone()),

            Value::String(v) => Self::coerce_string(v, target_type),
            Value::Json(v) => PgValue::Json(v.clone()),
            Value::Array(_) | Value::Object(_) => match *target_type {
                Type::JSON | Type::JSONB => PgValue::Json(value_to_json(value)),
                _ => PgValue::String(value_to_json(value).to_string()),
            },
            other => Self::from_value(other),
        }
    }

    fn coerce_int(value: i64, target_type: &Type) -> Self {
        match *target_type {
            // Out of range values stay 64-bit and fail when written
            Type::INT2 => i16::try_from(value).map_or(PgValue::Int64(value), PgValue::Int16),
            Type::INT4 => i32::try_from(value).map_or(PgValue::Int64(value), PgValue::Int32),
            Type::FLOAT4 => PgValue::Float32(value as f32),
            Type::FLOAT8 => PgValue::Float64(value as f64),
            Type::NUMERIC => PgValue::Numeric(value.to_string()),
            Type::TEXT | Type::VARCHAR => PgValue::String(value.to_string()),
            _ => PgValue::Int64(value),
        }
    }

    /// Parse request text into the argument's declared type; text that does
    /// not parse is sent as-is and left for the server to reject.
    fn coerce_string(value: &str, target_type: &Type) -> Self {
        let fallback = || PgValue::String(value.to_string());
        match *target_type {
            Type::INT2 => value.parse().map(PgValue::Int16).unwrap_or_else(|_| fallback()),
            Type::INT4 => value.parse().map(PgValue::Int32).unwrap_or_else(|_| fallback()),
            Type::INT8 => value.parse().map(PgValue::Int64).unwrap_or_else(|_| fallback()),
            Type::NUMERIC if encode_numeric(value).is_ok() => PgValue::Numeric(value.to_string()),
            Type::BOOL => match value.to_ascii_lowercase().as_str() {
                "true" | "t" | "1" => PgValue::Bool(true),
                "false" | "f" | "0" => PgValue::Bool(false),
                _ => fallback(),
            },
            Type::UUID => uuid::Uuid::parse_str(value)
                .map(PgValue::Uuid)
                .unwrap_or_else(|_| fallback()),
            Type::JSON | Type::JSONB => serde_json::from_str::<serde_json::Value>(value)
                .map(PgValue::Json)
                .unwrap_or_else(|_| fallback()),
            Type::DATE => chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .map(PgValue::Date)
                .unwrap_or_else(|_| fallback()),
            Type::TIME => chrono::NaiveTime::parse_from_str(value, "%H:%M:%S")
                .or_else(|_| chrono::NaiveTime::parse_from_str(value, "%H:%M:%S%.f"))
                .map(PgValue::Time)
                .unwrap_or_else(|_| fallback()),
            Type::TIMESTAMP => parse_naive_timestamp(value)
                .map(PgValue::DateTime)
                .unwrap_or_else(fallback),
            Type::TIMESTAMPTZ => chrono::DateTime::parse_from_rfc3339(value)
                .ok()
                .map(|timestamp| timestamp.with_timezone(&chrono::Utc))
                .or_else(|| parse_naive_timestamp(value).map(|timestamp| timestamp.and_utc()))
                .map(PgValue::DateTimeUtc)
                .unwrap_or_else(fallback),
            _ => fallback(),
        }
    }

    /// Used when the server reports no type for a placeholder
    pub(crate) fn from_value(value: &Value) -> Self {
        match value {
            Value::Null => PgValue::Null,
            Value::Bool(v) => PgValue::Bool(*v),
            Value::Int8(v) => PgValue::Int16(*v as i16),
            Value::Int16(v) => PgValue::Int16(*v),
            Value::Int32(v) => PgValue::Int32(*v),
            Value::Int64(v) => PgValue::Int64(*v),
            Value::Float32(v) => PgValue::Float32(*v),
            Value::Float64(v) => PgValue::Float64(*v),
            Value::Decimal(v) => PgValue::Numeric(v.clone()),
            Value::String(v) => PgValue::String(v.clone()),
            Value::Bytes(v) => PgValue::Bytes(v.clone()),
            Value::Uuid(v) => PgValue::Uuid(*v),
            Value::Json(v) => PgValue::Json(v.clone()),
            Value::DateTimeUtc(v) => PgValue::DateTimeUtc(*v),
            Value::Date(v) => PgValue::Date(*v),
            Value::Time(v) => PgValue::Time(*v),
            Value::DateTime(v) => PgValue::DateTime(*v),
            Value::Array(_) | Value::Object(_) => PgValue::Json(value_to_json(value)),
        }
    }
}

fn parse_naive_timestamp(value: &str) -> Option<chrono::NaiveDateTime> {
    chrono::NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| chrono::NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f"))
        .or_else(|_| chrono::NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f"))
        .ok()
        .or_else(|| {
            chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

/// Plain JSON rendering of a value, used for composite arguments
pub(crate) fn value_to_json(value: &Value) -> serde_json::Value {
    use serde_json::Value as Json;

    match value {
        Value::Null => Json::Null,
        Value::Bool(v) => Json::Bool(*v),
        Value::Int8(v) => Json::from(*v),
        Value::Int16(v) => Json::from(*v),
        Value::Int32(v) => Json::from(*v),
        Value::Int64(v) => Json::from(*v),
        Value::Float32(v) => Json::from(*v as f64),
        Value::Float64(v) => Json::from(*v),
        Value::Json(v) => v.clone(),
        Value::Array(items) => Json::Array(items.iter().map(value_to_json).collect()),
        Value::Object(fields) => Json::Object(
            fields
                .iter()
                .map(|(name, value)| (name.clone(), value_to_json(value)))
                .collect(),
        ),
        other => Json::String(other.to_string()),
    }
}

impl ToSql for PgValue {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> std::result::Result<postgres_types::IsNull, BoxError> {
        match self {
            PgValue::Null => Ok(postgres_types::IsNull::Yes),
            PgValue::Bool(v) => v.to_sql(ty, out),
            PgValue::Int16(v) => v.to_sql(ty, out),
            PgValue::Int32(v) => v.to_sql(ty, out),
            PgValue::Int64(v) if matches!(*ty, Type::INT2 | Type::INT4) => {
                Err(format!("integer {v} is out of range for type {}", ty.name()).into())
            }
            PgValue::Int64(v) => v.to_sql(ty, out),
            PgValue::Float32(v) => v.to_sql(ty, out),
            PgValue::Float64(v) => v.to_sql(ty, out),
            PgValue::Numeric(v) if *ty == Type::NUMERIC => {
                out.extend_from_slice(&encode_numeric(v)?);
                Ok(postgres_types::IsNull::No)
            }
            PgValue::Numeric(v) => v.to_sql(ty, out),
            PgValue::String(v) => v.to_sql(ty, out),
            PgValue::Bytes(v) => v.to_sql(ty, out),
            PgValue::Uuid(v) => v.to_sql(ty, out),
            PgValue::Json(v) => v.to_sql(ty, out),
            PgValue::DateTimeUtc(v) => v.to_sql(ty, out),
            PgValue::Date(v) => v.to_sql(ty, out),
            PgValue::Time(v) => v.to_sql(ty, out),
            PgValue::DateTime(v) => v.to_sql(ty, out),
        }
    }

    fn accepts(_: &Type) -> bool {
        true
    }

    postgres_types::to_sql_checked!();
}

/// Encode decimal text (`-12.3400`, `NaN`) in NUMERIC binary form
pub(crate) fn encode_numeric(text: &str) -> std::result::Result<Vec<u8>, BoxError> {
    let text = text.trim();
    if text.eq_ignore_ascii_case("nan") {
        let header = [0i16.to_be_bytes(), 0i16.to_be_bytes(), 0xC000u16.to_be_bytes(), 0i16.to_be_bytes()];
        return Ok(header.concat());
    }

    let (negative, unsigned) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let (integer, fraction) = unsigned.split_once('.').unwrap_or((unsigned, ""));
    if (integer.is_empty() && fraction.is_empty())
        || !integer.bytes().chain(fraction.bytes()).all(|b| b.is_ascii_digit())
    {
        return Err(format!("invalid numeric value: {text}").into());
    }

    let integer = integer.trim_start_matches('0');
    let dscale = fraction.len();
    let mut padded = "0".repeat((4 - integer.len() % 4) % 4);
    padded.push_str(integer);
    let integer_groups = padded.len() / 4;
    padded.push_str(fraction);
    padded.push_str(&"0".repeat((4 - fraction.len() % 4) % 4));

    let mut groups: Vec<u16> = padded
        .as_bytes()
        .chunks_exact(4)
        .map(|chunk| chunk.iter().fold(0u16, |acc, b| acc * 10 + u16::from(b - b'0')))
        .collect();
    let leading_zeros = groups.iter().take_while(|group| **group == 0).count();
    groups.drain(..leading_zeros);
    let mut weight = i16::try_from(integer_groups)
        .ok()
        .zip(i16::try_from(leading_zeros).ok())
        .and_then(|(integer_groups, leading_zeros)| {
            integer_groups.checked_sub(1)?.checked_sub(leading_zeros)
        })
        .ok_or_else(|| numeric_too_large(text))?;
    while groups.last() == Some(&0) {
        groups.pop();
    }

    let sign: u16 = if negative && !groups.is_empty() { 0x4000 } else { 0 };
    if groups.is_empty() {
        weight = 0;
    }

    let ndigits = i16::try_from(groups.len()).map_err(|_| numeric_too_large(text))?;
    let dscale = i16::try_from(dscale).map_err(|_| numeric_too_large(text))?;

    let mut out = Vec::with_capacity(8 + groups.len() * 2);
    out.extend_from_slice(&ndigits.to_be_bytes());
    out.extend_from_slice(&weight.to_be_bytes());
    out.extend_from_slice(&sign.to_be_bytes());
    out.extend_from_slice(&dscale.to_be_bytes());
    for group in groups {
        out.extend_from_slice(&group.to_be_bytes());
    }
    Ok(out)
}

fn numeric_too_large(text: &str) -> BoxError {
    format!("numeric value does not fit the NUMERIC wire format: {text}").into()
}

/// NUMERIC decoded to its exact decimal text
#[derive(Debug)]
pub(crate) struct PgNumericString(pub(crate) String);

/// Raw UTF-8 payload of a type we have no mapping for (enums, domains)
#[derive(Debug)]
struct PgFallbackString(String);

impl PgNumericString {
    pub(crate) fn parse(raw: &[u8]) -> std::result::Result<String, BoxError> {
        if raw.len() < 8 {
            return Err("invalid NUMERIC payload: too short".into());
        }

        let ndigits = usize::try_from(i16::from_be_bytes([raw[0], raw[1]]))
            .map_err(|_| "invalid NUMERIC payload: negative digit count")?;
        let weight = i16::from_be_bytes([raw[2], raw[3]]);
        let sign = u16::from_be_bytes([raw[4], raw[5]]);
        let dscale = usize::try_from(i16::from_be_bytes([raw[6], raw[7]]))
            .map_err(|_| "invalid NUMERIC payload: negative scale")?;

        if raw.len() < 8 + ndigits * 2 {
            return Err("invalid NUMERIC payload: truncated digits".into());
        }
        if sign == 0xC000 {
            return Ok("NaN".to_string());
        }

        let digits = raw[8..8 + ndigits * 2]
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect::<Vec<_>>();
        if digits.iter().any(|group| *group > 9999) {
            return Err("invalid NUMERIC payload: group out of range".into());
        }
        if digits.is_empty() {
            return Ok("0".to_string());
        }

        let integer_groups = if weight >= 0 { weight as usize + 1 } else { 0 };
        let mut integer_text = String::new();
        for index in 0..integer_groups {
            let group = digits.get(index).copied().unwrap_or(0);
            if index == 0 {
                integer_text.push_str(&group.to_string());
            } else {
                integer_text.push_str(&format!("{group:04}"));
            }
        }
        if integer_text.is_empty() {
            integer_text.push('0');
        }

        let mut fraction_text = String::new();
        if dscale > 0 {
            // Groups between the decimal point and the first stored digit
            let leading_zero_groups = match weight.checked_neg() {
                Some(distance) if distance > 1 => (distance - 1) as usize,
                Some(_) => 0,
                None => return Err("invalid NUMERIC payload: weight out of range".into()),
            };
            fraction_text.push_str(&"0000".repeat(leading_zero_groups));
            for group in digits.iter().skip(integer_groups.min(digits.len())) {
                fraction_text.push_str(&format!("{group:04}"));
            }
            if fraction_text.len() < dscale {
                fraction_text.push_str(&"0".repeat(dscale - fraction_text.len()));
            } else {
                fraction_text.truncate(dscale);
            }
            while fraction_text.ends_with('0') {
                fraction_text.pop();
            }
        }

        let mut output = String::new();
        if sign == 0x4000 && (integer_text != "0" || !fraction_text.is_empty()) {
            output.push('-');
        }
        output.push_str(&integer_text);
        if !fraction_text.is_empty() {
            output.push('.');
            output.push_str(&fraction_text);
        }
        Ok(output)
    }
}

impl<'a> FromSql<'a> for PgNumericString {
    fn from_sql(_: &Type, raw: &'a [u8]) -> std::result::Result<Self, BoxError> {
        Ok(Self(Self::parse(raw)?))
    }

    fn accepts(ty: &Type) -> bool {
        *ty == Type::NUMERIC
    }
}

impl<'a> FromSql<'a> for PgFallbackString {
    fn from_sql(_: &Type, raw: &'a [u8]) -> std::result::Result<Self, BoxError> {
        Ok(Self(String::from_utf8(raw.to_vec())?))
    }

    fn accepts(_: &Type) -> bool {
        true
    }
}

fn get<'a, T: FromSql<'a>>(row: &'a PgRow, idx: usize) -> Option<T> {
    row.try_get::<_, Option<T>>(idx).ok().flatten()
}

fn get_array<'a, T: FromSql<'a>>(row: &'a PgRow, idx: usize, wrap: fn(T) -> Value) -> Value {
    get::<Vec<T>>(row, idx)
        .map(|items| Value::Array(items.into_iter().map(wrap).collect()))
        .unwrap_or(Value::Null)
}

/// Convert one column of a PostgreSQL row into a [`Value`]
pub(crate) fn postgres_to_value(row: &PgRow, idx: usize) -> Value {
    let column = &row.columns()[idx];

    let value = match column.type_().name() {
        "bool" => get(row, idx).map(Value::Bool),
        "int2" => get(row, idx).map(Value::Int16),
        "int4" => get(row, idx).map(Value::Int32),
        "int8" => get(row, idx).map(Value::Int64),
        "oid" => get::<u32>(row, idx).map(|v| Value::Int64(v as i64)),
        "float4" => get(row, idx).map(Value::Float32),
        "float8" => get(row, idx).map(Value::Float64),
        "numeric" => get::<PgNumericString>(row, idx).map(|v| Value::Decimal(v.0)),
        "text" | "varchar" | "bpchar" | "name" => get(row, idx).map(Value::String),
        "bytea" => get(row, idx).map(Value::Bytes),
        "uuid" => get(row, idx).map(Value::Uuid),
        "json" | "jsonb" => get(row, idx).map(Value::Json),
        "date" => get(row, idx).map(Value::Date),
        "time" => get(row, idx).map(Value::Time),
        "timestamp" => get(row, idx).map(Value::DateTime),
        "timestamptz" => get(row, idx).map(Value::DateTimeUtc),
        "_text" | "_varchar" | "_bpchar" | "_name" => Some(get_array(row, idx, Value::String)),
        "_int2" => Some(get_array(row, idx, Value::Int16)),
        "_int4" => Some(get_array(row, idx, Value::Int32)),
        "_int8" => Some(get_array(row, idx, Value::Int64)),
        // Enums, domains and refcursor names arrive as raw text
        _ => get::<PgFallbackString>(row, idx).map(|v| Value::String(v.0)),
    };
    value.unwrap_or(Value::Null)
}

/// Convert server rows into named rows
pub(crate) fn convert_rows(pg_rows: &[PgRow]) -> Result<Vec<Row>> {
    let Some(first) = pg_rows.first() else {
        return Ok(Vec::new());
    };
    let columns: Vec<String> = first
        .columns()
        .iter()
        .map(|column| column.name().to_string())
        .collect();

    Ok(pg_rows
        .iter()
        .map(|pg_row| {
            let values = (0..columns.len())
                .map(|idx| postgres_to_value(pg_row, idx))
                .collect();
            Row::new(columns.clone(), values)
        })
        .collect())
}
