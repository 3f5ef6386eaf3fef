//! Shared parquet column-writing plumbing for the tabular artifacts.

use anyhow::{anyhow, Result};
use parquet::basic::{ConvertedType, Repetition, Type as PhysicalType};
use parquet::column::writer::ColumnWriter;
use parquet::data_type::ByteArray;
use parquet::file::properties::WriterProperties;
use parquet::file::writer::{SerializedFileWriter, SerializedRowGroupWriter};
use parquet::schema::types::Type;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

/// Column description used to assemble a flat schema.
pub enum Column {
    Utf8(&'static str),
    Int64(&'static str),
    Double(&'static str),
}

/// Build a parquet writer for a flat schema at `path`.
pub fn open_writer<P: AsRef<Path>>(
    path: P,
    group_name: &str,
    columns: &[Column],
) -> Result<SerializedFileWriter<File>> {
    let mut fields = Vec::with_capacity(columns.len());
    for c in columns {
        let field = match c {
            Column::Utf8(name) => Type::primitive_type_builder(name, PhysicalType::BYTE_ARRAY)
                .with_repetition(Repetition::REQUIRED)
                .with_converted_type(ConvertedType::UTF8)
                .build()?,
            Column::Int64(name) => Type::primitive_type_builder(name, PhysicalType::INT64)
                .with_repetition(Repetition::REQUIRED)
                .build()?,
            Column::Double(name) => Type::primitive_type_builder(name, PhysicalType::DOUBLE)
                .with_repetition(Repetition::REQUIRED)
                .build()?,
        };
        fields.push(Arc::new(field));
    }
    let schema = Type::group_type_builder(group_name)
        .with_fields(fields)
        .build()?;
    if let Some(parent) = path.as_ref().parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = File::create(path)?;
    let props = WriterProperties::builder().build();
    Ok(SerializedFileWriter::new(
        file,
        Arc::new(schema),
        Arc::new(props),
    )?)
}

pub fn write_utf8(
    row_group: &mut SerializedRowGroupWriter<'_, File>,
    values: &[String],
) -> Result<()> {
    let mut col = row_group
        .next_column()?
        .ok_or_else(|| anyhow!("no column left in row group"))?;
    let bytes: Vec<ByteArray> = values.iter().map(|s| ByteArray::from(s.as_str())).collect();
    match col.untyped() {
        ColumnWriter::ByteArrayColumnWriter(w) => {
            let _ = w.write_batch(&bytes, None, None)?;
        }
        _ => return Err(anyhow!("expected a UTF8 column")),
    }
    col.close()?;
    Ok(())
}

pub fn write_i64(
    row_group: &mut SerializedRowGroupWriter<'_, File>,
    values: &[i64],
) -> Result<()> {
    let mut col = row_group
        .next_column()?
        .ok_or_else(|| anyhow!("no column left in row group"))?;
    match col.untyped() {
        ColumnWriter::Int64ColumnWriter(w) => {
            let _ = w.write_batch(values, None, None)?;
        }
        _ => return Err(anyhow!("expected an INT64 column")),
    }
    col.close()?;
    Ok(())
}

pub fn write_f64(
    row_group: &mut SerializedRowGroupWriter<'_, File>,
    values: &[f64],
) -> Result<()> {
    let mut col = row_group
        .next_column()?
        .ok_or_else(|| anyhow!("no column left in row group"))?;
    match col.untyped() {
        ColumnWriter::DoubleColumnWriter(w) => {
            let _ = w.write_batch(values, None, None)?;
        }
        _ => return Err(anyhow!("expected a DOUBLE column")),
    }
    col.close()?;
    Ok(())
}
