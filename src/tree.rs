//! The bridge between the streaming interfaces and the in-memory tree.

use crate::error::{ArgumentError, Result};
use crate::stream::{IonReader, IonWriter, StreamItem};
use crate::symbols::SymbolToken;
use crate::types::IonType;
use crate::value::{Blob, Clob, Data, List, Sexp, Struct, Value};

/// Drives the reader to the end of its stream, materializing every
/// top-level value. Annotations, field order (including repeated fields),
/// and numeric/timestamp precision are all preserved.
pub fn load<R: IonReader>(reader: &mut R) -> Result<Vec<Value>> {
    let mut values = Vec::new();
    loop {
        match reader.next()? {
            StreamItem::VersionMarker => continue,
            StreamItem::EndOfStream | StreamItem::EndOfContainer => break,
            item => values.push(read_current_value(reader, item)?),
        }
    }
    Ok(values)
}

/// Traverses the tree, driving the writer's typed interface. The writer is
/// left unfinished so further values can follow; call `finish` to seal the
/// stream.
pub fn dump<W: IonWriter>(values: &[Value], writer: &mut W) -> Result<()> {
    for value in values {
        write_value(value, writer)?;
    }
    Ok(())
}

/// Materializes the value the reader's cursor currently rests on, stepping
/// through containers recursively.
pub(crate) fn read_current_value<R: IonReader + ?Sized>(
    reader: &mut R,
    item: StreamItem,
) -> Result<Value> {
    let annotations = reader.annotations()?;
    let data = match item {
        StreamItem::Null(ion_type) => Data::null_of(ion_type),
        StreamItem::Value(ion_type) => match ion_type {
            IonType::Null => Data::Null,
            IonType::Bool => Data::Bool(Some(reader.read_bool()?)),
            IonType::Int => Data::Int(Some(reader.read_int()?)),
            IonType::Float => Data::Float(Some(reader.read_f64()?)),
            IonType::Decimal => Data::Decimal(Some(reader.read_decimal()?)),
            IonType::Timestamp => Data::Timestamp(Some(reader.read_timestamp()?)),
            IonType::Symbol => Data::Symbol(Some(reader.read_symbol()?)),
            IonType::String => Data::String(Some(reader.read_string()?)),
            IonType::Clob => Data::Clob(Some(Clob {
                data: reader.read_clob()?,
            })),
            IonType::Blob => Data::Blob(Some(Blob {
                data: reader.read_blob()?,
            })),
            IonType::List | IonType::Sexp | IonType::Struct => {
                return Err(ArgumentError::NotAContainer.into());
            }
        },
        StreamItem::ContainerStart(IonType::Struct) => {
            reader.step_in()?;
            let mut fields = Vec::new();
            loop {
                match reader.next()? {
                    StreamItem::EndOfContainer | StreamItem::EndOfStream => break,
                    StreamItem::VersionMarker => continue,
                    item => {
                        let name = reader.field_name()?.unwrap_or(SymbolToken::Zero);
                        fields.push((name, read_current_value(reader, item)?));
                    }
                }
            }
            reader.step_out()?;
            Data::Struct(Some(Struct { fields }))
        }
        StreamItem::ContainerStart(ion_type) => {
            reader.step_in()?;
            let mut values = Vec::new();
            loop {
                match reader.next()? {
                    StreamItem::EndOfContainer | StreamItem::EndOfStream => break,
                    StreamItem::VersionMarker => continue,
                    item => values.push(read_current_value(reader, item)?),
                }
            }
            reader.step_out()?;
            if ion_type == IonType::List {
                Data::List(Some(List { values }))
            } else {
                Data::Sexp(Some(Sexp { values }))
            }
        }
        StreamItem::VersionMarker | StreamItem::EndOfContainer | StreamItem::EndOfStream => {
            return Err(ArgumentError::NoCurrentValue.into());
        }
    };
    Ok(Value { data, annotations })
}

/// Writes one value, annotations and all.
pub(crate) fn write_value<W: IonWriter + ?Sized>(value: &Value, writer: &mut W) -> Result<()> {
    for annotation in &value.annotations {
        writer.add_annotation(annotation.clone())?;
    }
    match &value.data {
        Data::Null => writer.write_null(IonType::Null),
        Data::Bool(None) => writer.write_null(IonType::Bool),
        Data::Bool(Some(value)) => writer.write_bool(*value),
        Data::Int(None) => writer.write_null(IonType::Int),
        Data::Int(Some(value)) => writer.write_int(value),
        Data::Float(None) => writer.write_null(IonType::Float),
        Data::Float(Some(value)) => writer.write_f64(*value),
        Data::Decimal(None) => writer.write_null(IonType::Decimal),
        Data::Decimal(Some(value)) => writer.write_decimal(value),
        Data::Timestamp(None) => writer.write_null(IonType::Timestamp),
        Data::Timestamp(Some(value)) => writer.write_timestamp(value),
        Data::String(None) => writer.write_null(IonType::String),
        Data::String(Some(value)) => writer.write_string(value),
        Data::Symbol(None) => writer.write_null(IonType::Symbol),
        Data::Symbol(Some(value)) => writer.write_symbol(value),
        Data::Clob(None) => writer.write_null(IonType::Clob),
        Data::Clob(Some(value)) => writer.write_clob(&value.data),
        Data::Blob(None) => writer.write_null(IonType::Blob),
        Data::Blob(Some(value)) => writer.write_blob(&value.data),
        Data::List(None) => writer.write_null(IonType::List),
        Data::List(Some(list)) => {
            writer.start_container(IonType::List)?;
            for value in &list.values {
                write_value(value, writer)?;
            }
            writer.end_container()
        }
        Data::Sexp(None) => writer.write_null(IonType::Sexp),
        Data::Sexp(Some(sexp)) => {
            writer.start_container(IonType::Sexp)?;
            for value in &sexp.values {
                write_value(value, writer)?;
            }
            writer.end_container()
        }
        Data::Struct(None) => writer.write_null(IonType::Struct),
        Data::Struct(Some(value)) => {
            writer.start_container(IonType::Struct)?;
            for (name, value) in &value.fields {
                writer.set_field_name(name.clone())?;
                write_value(value, writer)?;
            }
            writer.end_container()
        }
    }
}
