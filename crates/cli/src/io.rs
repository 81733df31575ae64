//! Tables in and out: CSV (or Parquet by extension) ↔ library inputs.
//!
//! Layouts
//! - Points: `id,x,y` plus any other columns, which are carried through to
//!   the output. Without an `id` column the row number is used.
//! - Supports and masks: one vertex per row, `support_id[,part],x,y`. Rows of
//!   one `(support_id, part)` form a ring in file order; parts of one id form
//!   a multipolygon. Ids keep their order of first appearance.
//! - Borders: `x,y` vertices in order.

use anyhow::{bail, Context, Result};
use aoe::classify::Observation;
use geo::{Coord, LineString, MultiPolygon, Point, Polygon};
use polars::prelude::*;
use std::collections::HashMap;
use std::fs::{self, File};
use std::path::Path;

/// Input points and the frame they were read from.
pub struct PointTable {
    pub frame: DataFrame,
    pub observations: Vec<Observation>,
}

fn is_parquet(path: &Path) -> bool {
    path.extension().is_some_and(|e| e == "parquet")
}

pub fn read_table(path: &Path) -> Result<DataFrame> {
    let df = if is_parquet(path) {
        let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
        ParquetReader::new(file).finish()?
    } else {
        LazyCsvReader::new(path)
            .with_infer_schema_length(Some(1000))
            .finish()?
            .collect()?
    };
    tracing::debug!(path = %path.display(), rows = df.height(), cols = df.width(), "read_table");
    Ok(df)
}

fn f64_column(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let s = df
        .column(name)
        .with_context(|| format!("missing column `{name}`"))?
        .cast(&DataType::Float64)?;
    s.f64()?
        .into_iter()
        .enumerate()
        .map(|(i, v)| v.with_context(|| format!("row {i}: empty `{name}`")))
        .collect()
}

fn str_column(df: &DataFrame, name: &str) -> Result<Vec<String>> {
    let s = df
        .column(name)
        .with_context(|| format!("missing column `{name}`"))?
        .cast(&DataType::String)?;
    s.str()?
        .into_iter()
        .enumerate()
        .map(|(i, v)| {
            v.map(str::to_string)
                .with_context(|| format!("row {i}: empty `{name}`"))
        })
        .collect()
}

pub fn read_points(path: &Path) -> Result<PointTable> {
    let frame = read_table(path)?;
    let xs = f64_column(&frame, "x")?;
    let ys = f64_column(&frame, "y")?;
    let ids = if frame.column("id").is_ok() {
        str_column(&frame, "id")?
    } else {
        (0..frame.height()).map(|i| i.to_string()).collect()
    };
    let observations = ids
        .into_iter()
        .zip(xs.into_iter().zip(ys))
        .map(|(id, (x, y))| Observation::new(id, Point::new(x, y)))
        .collect();
    Ok(PointTable {
        frame,
        observations,
    })
}

/// Polygons keyed by id, in order of first appearance.
pub fn read_polygons(path: &Path) -> Result<Vec<(String, MultiPolygon<f64>)>> {
    let df = read_table(path)?;
    let ids = str_column(&df, "support_id")?;
    let parts = if df.column("part").is_ok() {
        str_column(&df, "part")?
    } else {
        vec![String::new(); df.height()]
    };
    let xs = f64_column(&df, "x")?;
    let ys = f64_column(&df, "y")?;

    let mut order: Vec<(String, Vec<(String, Vec<Coord<f64>>)>)> = Vec::new();
    let mut slot: HashMap<String, usize> = HashMap::new();
    for (((id, part), x), y) in ids.into_iter().zip(parts).zip(xs).zip(ys) {
        let k = *slot.entry(id.clone()).or_insert_with(|| {
            order.push((id, Vec::new()));
            order.len() - 1
        });
        let rings = &mut order[k].1;
        let c = Coord { x, y };
        match rings.iter_mut().find(|(p, _)| *p == part) {
            Some((_, ring)) => ring.push(c),
            None => rings.push((part, vec![c])),
        }
    }

    order
        .into_iter()
        .map(|(id, rings)| {
            let mut polys = Vec::with_capacity(rings.len());
            for (part, ring) in rings {
                if ring.len() < 3 {
                    bail!("support `{id}` part `{part}`: a ring needs at least 3 vertices");
                }
                polys.push(Polygon::new(LineString::from(ring), vec![]));
            }
            Ok((id, MultiPolygon::new(polys)))
        })
        .collect()
}

/// Every polygon in the file as one region.
pub fn read_region(path: &Path) -> Result<MultiPolygon<f64>> {
    Ok(MultiPolygon::new(
        read_polygons(path)?
            .into_iter()
            .flat_map(|(_, mp)| mp.0)
            .collect(),
    ))
}

pub fn read_line(path: &Path) -> Result<LineString<f64>> {
    let df = read_table(path)?;
    let xs = f64_column(&df, "x")?;
    let ys = f64_column(&df, "y")?;
    Ok(LineString::from(xs.into_iter().zip(ys).collect::<Vec<_>>()))
}

/// Rows of `frame` at `indices`, with extra string columns appended.
pub fn long_format(
    frame: &DataFrame,
    indices: &[usize],
    extra: Vec<(&str, Vec<String>)>,
) -> Result<DataFrame> {
    let idx: Vec<IdxSize> = indices.iter().map(|&i| i as IdxSize).collect();
    let mut out = frame.take(&IdxCa::from_vec("idx".into(), idx))?;
    for (name, values) in extra {
        out.with_column(Series::new(name.into(), values))?;
    }
    Ok(out)
}

pub fn write_table(df: &mut DataFrame, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    if is_parquet(path) {
        ParquetWriter::new(&mut file).finish(df)?;
    } else {
        CsvWriter::new(&mut file).include_header(true).finish(df)?;
    }
    tracing::info!(path = %path.display(), rows = df.height(), "write_table");
    Ok(())
}
