//! Conversions between DuckDB's type system and the JSON-facing core model.

use chrono::{DateTime, NaiveTime};
use duckdb::arrow::datatypes::DataType;
use duckdb::types::{TimeUnit, Value};
use duckserve_core::{DataValue, DuckserveError, TypeTag};

const MICROS_PER_SECOND: i64 = 1_000_000;
const MICROS_PER_DAY: i64 = 86_400 * MICROS_PER_SECOND;
// DuckDB stores `'infinity'::DATE` and its negation at the ends of the i32 range.
const DATE_INFINITY: i32 = i32::MAX;

/// Maps the Arrow type DuckDB reports for a result column to its engine tag.
pub fn type_tag(data_type: &DataType) -> TypeTag {
    match data_type {
        DataType::Boolean => TypeTag::Boolean,
        DataType::Int8 => TypeTag::TinyInt,
        DataType::Int16 => TypeTag::SmallInt,
        DataType::Int32 => TypeTag::Integer,
        DataType::Int64 => TypeTag::BigInt,
        DataType::UInt8 => TypeTag::UTinyInt,
        DataType::UInt16 => TypeTag::USmallInt,
        DataType::UInt32 => TypeTag::UInteger,
        DataType::UInt64 => TypeTag::UBigInt,
        // HUGEINT is exported as a scale-0, 38-digit decimal
        DataType::Decimal128(38, 0) => TypeTag::HugeInt,
        DataType::Float32 => TypeTag::Real,
        DataType::Float64 => TypeTag::Double,
        DataType::Utf8 | DataType::LargeUtf8 => TypeTag::Varchar,
        DataType::Date32 | DataType::Date64 => TypeTag::Date,
        DataType::Time32(_) | DataType::Time64(_) => TypeTag::Time,
        DataType::Timestamp(_, Some(_)) => TypeTag::TimestampTz,
        DataType::Timestamp(_, None) => TypeTag::Timestamp,
        DataType::Interval(_) => TypeTag::Interval,
        DataType::List(field) | DataType::LargeList(field) | DataType::FixedSizeList(field, _) => {
            TypeTag::List(Box::new(type_tag(field.data_type())))
        }
        DataType::Decimal128(_, _) | DataType::Decimal256(_, _) => TypeTag::Other("DECIMAL".into()),
        other => TypeTag::Other(format!("{other:?}").to_ascii_uppercase()),
    }
}

pub fn data_value(value: Value) -> DataValue {
    match value {
        Value::Null => DataValue::Null,
        Value::Boolean(v) => DataValue::Boolean(v),
        Value::TinyInt(v) => DataValue::Integer(v.into()),
        Value::SmallInt(v) => DataValue::Integer(v.into()),
        Value::Int(v) => DataValue::Integer(v.into()),
        Value::UTinyInt(v) => DataValue::Integer(v.into()),
        Value::USmallInt(v) => DataValue::Integer(v.into()),
        Value::UInt(v) => DataValue::Integer(v.into()),
        Value::BigInt(v) => DataValue::BigInt(v.into()),
        Value::UBigInt(v) => DataValue::BigInt(v.into()),
        Value::HugeInt(v) => DataValue::BigInt(v),
        Value::Float(v) => float(f64::from(v)),
        Value::Double(v) => float(v),
        Value::Decimal(v) => DataValue::Text(v.to_string()),
        Value::Text(v) | Value::Enum(v) => DataValue::Text(v),
        Value::Blob(v) => DataValue::Blob(v),
        Value::Date32(days) => date(days),
        Value::Timestamp(unit, v) => timestamp(to_micros(unit, v)),
        Value::Time64(unit, v) => time_of_day(to_micros(unit, v)),
        Value::Interval {
            months,
            days,
            nanos,
        } => DataValue::Interval {
            months,
            days,
            micros: nanos / 1_000,
        },
        Value::List(items) | Value::Array(items) => {
            DataValue::List(items.into_iter().map(data_value).collect())
        }
        other => DataValue::Text(format!("{other:?}")),
    }
}

/// Converts one JSON request parameter into a bindable value.
pub fn param_value(param: &serde_json::Value) -> Result<Value, DuckserveError> {
    match param {
        serde_json::Value::Null => Ok(Value::Null),
        serde_json::Value::Bool(v) => Ok(Value::Boolean(*v)),
        serde_json::Value::Number(n) => {
            if let Some(v) = n.as_i64() {
                Ok(Value::BigInt(v))
            } else if let Some(v) = n.as_u64() {
                Ok(Value::UBigInt(v))
            } else {
                n.as_f64()
                    .map(Value::Double)
                    .ok_or_else(|| DuckserveError::InvalidRequest(format!("unsupported number: {n}")))
            }
        }
        serde_json::Value::String(v) => Ok(Value::Text(v.clone())),
        other => Err(DuckserveError::InvalidRequest(format!(
            "params must be scalars, got {other}"
        ))),
    }
}

fn float(v: f64) -> DataValue {
    if v.is_finite() {
        DataValue::Float(v)
    } else {
        DataValue::Null
    }
}

fn to_micros(unit: TimeUnit, v: i64) -> i64 {
    match unit {
        TimeUnit::Second => v.saturating_mul(MICROS_PER_SECOND),
        TimeUnit::Millisecond => v.saturating_mul(1_000),
        TimeUnit::Microsecond => v,
        TimeUnit::Nanosecond => v / 1_000,
    }
}

/// Dates outside the range a microsecond timestamp can hold become null.
fn date(days: i32) -> DataValue {
    match days {
        DATE_INFINITY => DataValue::Text("infinity".into()),
        days if days == -DATE_INFINITY => DataValue::Text("-infinity".into()),
        days => i64::from(days)
            .checked_mul(MICROS_PER_DAY)
            .map(timestamp)
            .unwrap_or(DataValue::Null),
    }
}

fn timestamp(micros: i64) -> DataValue {
    let secs = micros.div_euclid(MICROS_PER_SECOND);
    let nanos = (micros.rem_euclid(MICROS_PER_SECOND) * 1_000) as u32;
    match DateTime::from_timestamp(secs, nanos) {
        Some(ts) => DataValue::Date(ts.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()),
        None => DataValue::Null,
    }
}

fn time_of_day(micros: i64) -> DataValue {
    let secs = micros.div_euclid(MICROS_PER_SECOND);
    let nanos = (micros.rem_euclid(MICROS_PER_SECOND) * 1_000) as u32;
    u32::try_from(secs)
        .ok()
        .and_then(|secs| NaiveTime::from_num_seconds_from_midnight_opt(secs, nanos))
        .map(|time| DataValue::Date(time.format("%H:%M:%S%.f").to_string()))
        .unwrap_or(DataValue::Null)
}

#[cfg(test)]
mod tests {
    use super::{data_value, param_value, type_tag, DATE_INFINITY};
    use duckdb::arrow::datatypes::{DataType, Field, IntervalUnit, TimeUnit as ArrowTimeUnit};
    use duckdb::types::{TimeUnit, Value};
    use duckserve_core::{DataValue, TypeTag};
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn arrow_types_map_to_tags() {
        assert_eq!(type_tag(&DataType::Int32), TypeTag::Integer);
        assert_eq!(type_tag(&DataType::UInt64), TypeTag::UBigInt);
        assert_eq!(type_tag(&DataType::Decimal128(38, 0)), TypeTag::HugeInt);
        assert_eq!(type_tag(&DataType::Decimal128(18, 3)), TypeTag::Other("DECIMAL".into()));
        assert_eq!(
            type_tag(&DataType::Timestamp(ArrowTimeUnit::Microsecond, Some("UTC".into()))),
            TypeTag::TimestampTz
        );
        assert_eq!(
            type_tag(&DataType::Timestamp(ArrowTimeUnit::Microsecond, None)),
            TypeTag::Timestamp
        );
        assert_eq!(
            type_tag(&DataType::Interval(IntervalUnit::MonthDayNano)),
            TypeTag::Interval
        );
        let list = DataType::List(Arc::new(Field::new("item", DataType::Int64, true)));
        assert_eq!(type_tag(&list), TypeTag::List(Box::new(TypeTag::BigInt)));
    }

    #[test]
    fn wide_integers_become_bigints() {
        assert_eq!(data_value(Value::BigInt(i64::MAX)), DataValue::BigInt(i64::MAX.into()));
        assert_eq!(data_value(Value::UBigInt(u64::MAX)), DataValue::BigInt(u64::MAX.into()));
        assert_eq!(data_value(Value::HugeInt(-5)), DataValue::BigInt(-5));
        assert_eq!(data_value(Value::UInt(7)), DataValue::Integer(7));
    }

    #[test]
    fn temporal_values_are_iso_text() {
        assert_eq!(
            data_value(Value::Date32(19_737)),
            DataValue::Date("2024-01-15T00:00:00.000Z".into())
        );
        assert_eq!(
            data_value(Value::Timestamp(TimeUnit::Microsecond, 1_705_314_645_123_456)),
            DataValue::Date("2024-01-15T10:30:45.123Z".into())
        );
        assert_eq!(
            data_value(Value::Time64(TimeUnit::Microsecond, 45_296_000_000)),
            DataValue::Date("12:34:56".into())
        );
        assert_eq!(
            data_value(Value::Interval {
                months: 1,
                days: 2,
                nanos: 3_000
            }),
            DataValue::Interval {
                months: 1,
                days: 2,
                micros: 3
            }
        );
    }

    #[test]
    fn out_of_range_dates_do_not_overflow() {
        assert_eq!(
            data_value(Value::Date32(DATE_INFINITY)),
            DataValue::Text("infinity".into())
        );
        assert_eq!(
            data_value(Value::Date32(-DATE_INFINITY)),
            DataValue::Text("-infinity".into())
        );
        // 300000-01-01
        assert_eq!(data_value(Value::Date32(108_853_222)), DataValue::Null);
        assert_eq!(data_value(Value::Date32(i32::MIN)), DataValue::Null);
        assert_eq!(
            data_value(Value::Date32(-719_162)),
            DataValue::Date("0001-01-01T00:00:00.000Z".into())
        );
    }

    #[test]
    fn non_finite_floats_become_null() {
        assert_eq!(data_value(Value::Double(f64::NAN)), DataValue::Null);
        assert_eq!(data_value(Value::Float(1.5)), DataValue::Float(1.5));
    }

    #[test]
    fn params_accept_scalars_only() {
        assert!(matches!(param_value(&json!(null)), Ok(Value::Null)));
        assert!(matches!(param_value(&json!(true)), Ok(Value::Boolean(true))));
        assert!(matches!(param_value(&json!(42)), Ok(Value::BigInt(42))));
        assert!(matches!(param_value(&json!(u64::MAX)), Ok(Value::UBigInt(u64::MAX))));
        assert!(matches!(param_value(&json!(2.5)), Ok(Value::Double(v)) if v == 2.5));
        assert!(matches!(param_value(&json!("x")), Ok(Value::Text(ref v)) if v == "x"));
        assert!(param_value(&json!([1, 2])).is_err());
        assert!(param_value(&json!({"a": 1})).is_err());
    }
}
