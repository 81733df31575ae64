mod io;
mod provenance;

use anyhow::{bail, Context, Result};
use aoe::adaptive::{expand_to_count, ExpandParams};
use aoe::border::{classify_by_border, BorderParams};
use aoe::expand::{Method, Target};
use aoe::orchestrate::{classify, ClassifyParams};
use aoe::result::{area_statistics, AreaRow, LongFormResult};
use aoe::support::{FragmentPolicy, Support};
use aoe::{EngineCfg, PlanarEngine, SolverCfg, Warning};
use clap::{Args, Parser, Subcommand, ValueEnum};
use geo::{coord, MultiPolygon, Point, Rect};
use polars::prelude::{df, DataFrame};
use provenance::Payload;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing_subscriber::fmt::SubscriberBuilder;

#[derive(Parser)]
#[command(name = "cli")]
#[command(about = "Area-of-effect point classification")]
struct Cmd {
    /// JSON file with `solver` and `engine` settings (missing keys keep defaults)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    action: Action,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum MethodArg {
    Buffer,
    ScaleAffine,
}

impl From<MethodArg> for Method {
    fn from(m: MethodArg) -> Self {
        match m {
            MethodArg::Buffer => Method::Buffer,
            MethodArg::ScaleAffine => Method::ScaleAffine,
        }
    }
}

#[derive(Args)]
struct SupportArgs {
    /// Support vertices: `support_id[,part],x,y`
    #[arg(long)]
    support: PathBuf,
    /// Mask vertices, same layout; all rows form one region
    #[arg(long)]
    mask: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = MethodArg::Buffer)]
    method: MethodArg,
    /// Keep only the largest part of a multipolygon support when it is at
    /// least this many times larger than the next one
    #[arg(long)]
    keep_dominant: Option<f64>,
}

impl SupportArgs {
    fn fragments(&self) -> FragmentPolicy {
        match self.keep_dominant {
            Some(ratio) => FragmentPolicy::KeepDominant { ratio },
            None => FragmentPolicy::KeepAll,
        }
    }

    fn supports(&self) -> Result<Vec<Support>> {
        Ok(io::read_polygons(&self.support)?
            .into_iter()
            .map(|(id, g)| Support::new(id, g))
            .collect())
    }
}

#[derive(Subcommand)]
enum Action {
    /// Classify points against each support at a fixed scale or halo area
    Classify {
        #[arg(long)]
        points: PathBuf,
        #[command(flatten)]
        support: SupportArgs,
        /// Linear scale `s` (area multiplier `(1+s)^2`); default √2−1
        #[arg(long)]
        scale: Option<f64>,
        /// Halo area relative to the support area, measured after masking
        #[arg(long)]
        area: Option<f64>,
        /// Fixed point `x,y` for scale_affine with a single support
        #[arg(long, value_delimiter = ',', num_args = 2)]
        reference: Option<Vec<f64>>,
        #[arg(long)]
        out: PathBuf,
    },
    /// Smallest expansion per support capturing `min_points` points
    Expand {
        #[arg(long)]
        points: PathBuf,
        #[command(flatten)]
        support: SupportArgs,
        #[arg(long)]
        min_points: usize,
        #[arg(long, default_value_t = 2.0)]
        max_area: f64,
        #[arg(long)]
        max_dist: Option<f64>,
        #[arg(long)]
        out: PathBuf,
    },
    /// Classify points by side of a border line
    Border {
        #[arg(long)]
        points: PathBuf,
        /// Border vertices: `x,y` in order
        #[arg(long)]
        border: PathBuf,
        #[arg(long)]
        width: Option<f64>,
        /// Core area per side
        #[arg(long)]
        area: Option<f64>,
        #[arg(long)]
        halo_width: Option<f64>,
        #[arg(long)]
        halo_area: Option<f64>,
        #[arg(long)]
        mask: Option<PathBuf>,
        /// `minx,miny,maxx,maxy`
        #[arg(long, value_delimiter = ',', num_args = 4)]
        bbox: Option<Vec<f64>>,
        #[arg(long, value_delimiter = ',')]
        side_names: Option<Vec<String>>,
        #[arg(long)]
        out: PathBuf,
    },
    /// Core, halo and AoE areas per support
    Stats {
        #[command(flatten)]
        support: SupportArgs,
        #[arg(long)]
        scale: Option<f64>,
        #[arg(long)]
        area: Option<f64>,
        #[arg(long)]
        out: PathBuf,
    },
    /// Print a small provenance JSON block
    Report,
}

/// Settings loadable with `--config`.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct CliCfg {
    solver: SolverCfg,
    engine: EngineCfg,
}

fn load_cfg(path: Option<&Path>) -> Result<CliCfg> {
    match path {
        None => Ok(CliCfg::default()),
        Some(p) => {
            let bytes = std::fs::read(p).with_context(|| format!("reading {}", p.display()))?;
            serde_json::from_slice(&bytes).with_context(|| format!("parsing {}", p.display()))
        }
    }
}

fn main() -> Result<()> {
    SubscriberBuilder::default().with_target(false).init();
    let cmd = Cmd::parse();
    let cfg = load_cfg(cmd.config.as_deref())?;
    match cmd.action {
        Action::Classify {
            points,
            support,
            scale,
            area,
            reference,
            out,
        } => run_classify(&cfg, &points, &support, scale, area, reference.as_deref(), &out),
        Action::Expand {
            points,
            support,
            min_points,
            max_area,
            max_dist,
            out,
        } => run_expand(&cfg, &points, &support, min_points, max_area, max_dist, &out),
        Action::Border {
            points,
            border,
            width,
            area,
            halo_width,
            halo_area,
            mask,
            bbox,
            side_names,
            out,
        } => {
            let params = BorderParams {
                width,
                area,
                halo_width,
                halo_area,
                mask: mask.as_deref().map(io::read_region).transpose()?,
                bbox: bbox.as_deref().map(parse_bbox).transpose()?,
                side_names: side_names.unwrap_or_else(|| BorderParams::default().side_names),
                solver: cfg.solver,
            };
            run_border(&cfg, &points, &border, &params, &out)
        }
        Action::Stats {
            support,
            scale,
            area,
            out,
        } => run_stats(&cfg, &support, scale, area, &out),
        Action::Report => report(&cfg),
    }
}

fn parse_bbox(v: &[f64]) -> Result<Rect<f64>> {
    let [x0, y0, x1, y1] = v else {
        bail!("--bbox takes minx,miny,maxx,maxy");
    };
    Ok(Rect::new(coord! { x: *x0, y: *y0 }, coord! { x: *x1, y: *y1 }))
}

fn parse_reference(v: Option<&[f64]>) -> Result<Option<Point<f64>>> {
    match v {
        None => Ok(None),
        Some([x, y]) => Ok(Some(Point::new(*x, *y))),
        Some(_) => bail!("--reference takes x,y"),
    }
}

fn load_mask(path: Option<&Path>) -> Result<Option<MultiPolygon<f64>>> {
    path.map(io::read_region).transpose()
}

fn warnings_json(warnings: &[Warning]) -> Result<serde_json::Value> {
    for w in warnings {
        tracing::warn!("{w}");
    }
    Ok(serde_json::to_value(warnings)?)
}

fn write_long_format(table: &io::PointTable, result: &LongFormResult, out: &Path) -> Result<()> {
    let indices: Vec<usize> = result.rows.iter().map(|r| r.point_index).collect();
    let mut df = io::long_format(
        &table.frame,
        &indices,
        vec![
            ("support_id", result.rows.iter().map(|r| r.support_id.clone()).collect()),
            ("aoe_class", result.rows.iter().map(|r| r.class.to_string()).collect()),
        ],
    )?;
    io::write_table(&mut df, out)
}

fn run_classify(
    cfg: &CliCfg,
    points: &Path,
    sargs: &SupportArgs,
    scale: Option<f64>,
    area: Option<f64>,
    reference: Option<&[f64]>,
    out: &Path,
) -> Result<()> {
    let engine = PlanarEngine::new(cfg.engine);
    let table = io::read_points(points)?;
    let params = ClassifyParams {
        target: Target::from_options(scale, area)?,
        method: sargs.method.into(),
        reference: parse_reference(reference)?,
        mask: load_mask(sargs.mask.as_deref())?,
        fragments: sargs.fragments(),
        solver: cfg.solver,
    };
    let result = classify(&engine, &table.observations, &sargs.supports()?, &params)?;
    write_long_format(&table, &result, out)?;

    let payload = Payload::new(json!({
        "command": "classify",
        "points": points,
        "support": sargs.support,
        "mask": sargs.mask,
        "target": params.target,
        "method": params.method,
        "fragments": params.fragments,
        "solver": cfg.solver,
        "engine": cfg.engine,
        "summary": result.summary(),
    }))
    .with_warnings(warnings_json(&result.warnings)?);
    provenance::write_sidecar(out, payload)?;
    Ok(())
}

fn run_expand(
    cfg: &CliCfg,
    points: &Path,
    sargs: &SupportArgs,
    min_points: usize,
    max_area: f64,
    max_dist: Option<f64>,
    out: &Path,
) -> Result<()> {
    let engine = PlanarEngine::new(cfg.engine);
    let table = io::read_points(points)?;
    let params = ExpandParams {
        max_area,
        max_dist,
        method: sargs.method.into(),
        mask: load_mask(sargs.mask.as_deref())?,
        fragments: sargs.fragments(),
        solver: cfg.solver,
        ..ExpandParams::new(min_points)
    };
    let result = expand_to_count(&engine, &table.observations, &sargs.supports()?, &params)?;
    write_long_format(&table, &result, out)?;

    let payload = Payload::new(json!({
        "command": "expand",
        "points": points,
        "support": sargs.support,
        "mask": sargs.mask,
        "parameter": result.parameter,
        "method": params.method,
        "solver": cfg.solver,
        "engine": cfg.engine,
        "records": result.expansion_records(),
    }))
    .with_warnings(warnings_json(&result.warnings)?);
    provenance::write_sidecar(out, payload)?;
    Ok(())
}

fn run_border(
    cfg: &CliCfg,
    points: &Path,
    border: &Path,
    params: &BorderParams,
    out: &Path,
) -> Result<()> {
    let engine = PlanarEngine::new(cfg.engine);
    let table = io::read_points(points)?;
    let line = io::read_line(border)?;
    let result = classify_by_border(&engine, &table.observations, &line, params)?;

    let indices: Vec<usize> = result.rows.iter().map(|r| r.point_index).collect();
    let mut df = io::long_format(
        &table.frame,
        &indices,
        vec![
            ("side", result.rows.iter().map(|r| r.side.clone()).collect()),
            ("aoe_class", result.rows.iter().map(|r| r.class.to_string()).collect()),
        ],
    )?;
    io::write_table(&mut df, out)?;

    let payload = Payload::new(json!({
        "command": "border",
        "points": points,
        "border": border,
        "core_width": result.geometry.core_width,
        "halo_width": result.geometry.halo_width,
        "side_names": result.side_names,
        "solver": cfg.solver,
        "engine": cfg.engine,
        "summary": result.summary(),
        "zones": result.zone_areas(&engine),
    }))
    .with_warnings(warnings_json(&result.warnings)?);
    provenance::write_sidecar(out, payload)?;
    Ok(())
}

fn stats_frame(rows: &[AreaRow]) -> Result<DataFrame> {
    let col = |f: fn(&AreaRow) -> f64| rows.iter().map(f).collect::<Vec<f64>>();
    Ok(df!(
        "support_id" => rows.iter().map(|r| r.support_id.clone()).collect::<Vec<_>>(),
        "area_core" => col(|r| r.area_core),
        "area_halo" => col(|r| r.area_halo),
        "area_aoe" => col(|r| r.area_aoe),
        "halo_core_ratio" => col(|r| r.halo_core_ratio),
        "pct_masked" => col(|r| r.pct_masked),
        "scale_used" => col(|r| r.scale_used),
    )?)
}

fn run_stats(
    cfg: &CliCfg,
    sargs: &SupportArgs,
    scale: Option<f64>,
    area: Option<f64>,
    out: &Path,
) -> Result<()> {
    let engine = PlanarEngine::new(cfg.engine);
    let params = ClassifyParams {
        target: Target::from_options(scale, area)?,
        method: sargs.method.into(),
        mask: load_mask(sargs.mask.as_deref())?,
        fragments: sargs.fragments(),
        solver: cfg.solver,
        ..ClassifyParams::default()
    };
    let result = classify(&engine, &[], &sargs.supports()?, &params)?;
    let rows = area_statistics(&engine, &result)?;
    io::write_table(&mut stats_frame(&rows)?, out)?;

    let payload = Payload::new(json!({
        "command": "stats",
        "support": sargs.support,
        "mask": sargs.mask,
        "target": params.target,
        "method": params.method,
        "solver": cfg.solver,
        "engine": cfg.engine,
    }))
    .with_warnings(warnings_json(&result.warnings)?);
    provenance::write_sidecar(out, payload)?;
    Ok(())
}

fn report(cfg: &CliCfg) -> Result<()> {
    let obj = json!({
        "code_rev": provenance::current_git_rev(),
        "aoe_version": aoe::VERSION,
        "solver": cfg.solver,
        "engine": cfg.engine,
    });
    println!("{}", serde_json::to_string_pretty(&obj)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::DataType;
    use std::fs;
    use tempfile::tempdir;

    const SQUARE: &str = "support_id,x,y\nsq,0,0\nsq,10,0\nsq,10,10\nsq,0,10\n";

    fn support_args(path: PathBuf) -> SupportArgs {
        SupportArgs {
            support: path,
            mask: None,
            method: MethodArg::Buffer,
            keep_dominant: None,
        }
    }

    #[test]
    fn classify_writes_long_format_and_sidecar() {
        let dir = tempdir().unwrap();
        let points = dir.path().join("points.csv");
        fs::write(
            &points,
            "id,x,y,label\np1,5,5,a\np2,2,2,b\np3,12,5,c\np4,100,100,d\n",
        )
        .unwrap();
        let support = dir.path().join("support.csv");
        fs::write(&support, SQUARE).unwrap();
        let out = dir.path().join("out.csv");

        let cfg = CliCfg::default();
        run_classify(&cfg, &points, &support_args(support), None, None, None, &out).unwrap();

        let df = io::read_table(&out).unwrap();
        assert_eq!(df.height(), 3);
        let classes = df.column("aoe_class").unwrap().cast(&DataType::String).unwrap();
        let classes: Vec<&str> = classes.str().unwrap().into_iter().flatten().collect();
        assert_eq!(classes, vec!["core", "core", "halo"]);
        assert!(df.column("label").is_ok());

        let sidecar = dir.path().join("out.provenance.json");
        let doc: serde_json::Value = serde_json::from_slice(&fs::read(sidecar).unwrap()).unwrap();
        assert_eq!(doc["params"]["command"], "classify");
        assert_eq!(doc["params"]["summary"][0]["halo"], 1);
    }

    #[test]
    fn expand_records_land_in_sidecar() {
        let dir = tempdir().unwrap();
        let points = dir.path().join("points.csv");
        fs::write(&points, "id,x,y\nin,5,5\nnear,13,5\n").unwrap();
        let support = dir.path().join("support.csv");
        fs::write(&support, SQUARE).unwrap();
        let out = dir.path().join("expand.csv");
        run_expand(&CliCfg::default(), &points, &support_args(support), 2, 2.0, None, &out).unwrap();
        assert_eq!(io::read_table(&out).unwrap().height(), 2);
        let doc: serde_json::Value =
            serde_json::from_slice(&fs::read(dir.path().join("expand.provenance.json")).unwrap())
                .unwrap();
        assert_eq!(doc["params"]["records"][0]["target_reached"], true);
        assert_eq!(doc["params"]["parameter"]["mode"], "min_points");
        assert_eq!(doc["warnings"], serde_json::json!([]));
    }

    #[test]
    fn scale_and_area_together_fail() {
        let dir = tempdir().unwrap();
        let points = dir.path().join("points.csv");
        fs::write(&points, "id,x,y\np,1,1\n").unwrap();
        let support = dir.path().join("support.csv");
        fs::write(&support, SQUARE).unwrap();
        let out = dir.path().join("out.csv");
        let err = run_classify(
            &CliCfg::default(),
            &points,
            &support_args(support),
            Some(1.0),
            Some(1.0),
            None,
            &out,
        )
        .unwrap_err();
        assert!(format!("{err}").contains("mutually exclusive"));
        assert!(!out.exists());
    }

    #[test]
    fn stats_and_border_outputs() {
        let dir = tempdir().unwrap();
        let support = dir.path().join("support.csv");
        fs::write(&support, SQUARE).unwrap();
        let stats = dir.path().join("stats.csv");
        run_stats(&CliCfg::default(), &support_args(support), None, None, &stats).unwrap();
        let df = io::read_table(&stats).unwrap();
        assert_eq!(df.height(), 1);
        let ratio = df.column("halo_core_ratio").unwrap().f64().unwrap().get(0).unwrap();
        assert!((ratio - 1.0).abs() < 0.01);

        let points = dir.path().join("points.csv");
        fs::write(&points, "id,x,y\nn,5,0.5\ns,5,-1.5\nfar,5,9\n").unwrap();
        let border = dir.path().join("border.csv");
        fs::write(&border, "x,y\n0,0\n10,0\n").unwrap();
        let out = dir.path().join("border_out.csv");
        let params = BorderParams {
            width: Some(1.0),
            ..BorderParams::default()
        };
        run_border(&CliCfg::default(), &points, &border, &params, &out).unwrap();
        let df = io::read_table(&out).unwrap();
        assert_eq!(df.height(), 2);
        let sides = df.column("side").unwrap().cast(&DataType::String).unwrap();
        let sides: Vec<&str> = sides.str().unwrap().into_iter().flatten().collect();
        assert_eq!(sides, vec!["side_1", "side_2"]);
    }

    #[test]
    fn config_file_overrides_some_fields() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cfg.json");
        fs::write(&path, r#"{"solver": {"search_max_iter": 5}, "engine": {"arc_segments": 64}}"#)
            .unwrap();
        let cfg = load_cfg(Some(&path)).unwrap();
        assert_eq!(cfg.solver.search_max_iter, 5);
        assert_eq!(cfg.solver.buffer_max_iter, 50);
        assert_eq!(cfg.engine.arc_segments, 64);
        assert!(parse_bbox(&[0.0, 0.0, 1.0]).is_err());
        assert_eq!(parse_reference(Some(&[1.0, 2.0])).unwrap(), Some(Point::new(1.0, 2.0)));
    }
}
