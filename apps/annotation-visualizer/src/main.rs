//! 多标注者一致度的无界面外壳.
//!
//! 读取一卷扫描与标注根目录下所有标注者的标注层,
//! 把每个切片的一致度图连同重缩放后的扫描切片导出为灰度 PNG.
//! 热度配色属于窗口端的显示管线, 这里保留的是灰度等级信息本身.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use stir_berry::codec;
use stir_berry::dataset;
use stir_berry::prelude::*;

const USAGE: &str = "\
Usage: annotation-visualizer <scan.raw> <out-dir> [options]
Options:
    --method <LSC|TPS>         segmentation method (default LSC)
    --tier <lower|higher>      superpixel tier (default lower)
    --mode <manual|sp|both>    aggregation mode (default both)
    --annotators <a,b,...>     restrict to the named annotators";

/// 解析完成的运行参数.
struct Args {
    scan_file: PathBuf,
    out_dir: PathBuf,
    method: SegMethod,
    tier: SpTier,
    mode: AggregateMode,
    annotators: Option<Vec<String>>,
}

fn parse_args() -> Result<Args, String> {
    let mut it = std::env::args().skip(1);
    let scan_file = PathBuf::from(it.next().ok_or("missing <scan.raw>")?);
    let out_dir = PathBuf::from(it.next().ok_or("missing <out-dir>")?);

    let mut args = Args {
        scan_file,
        out_dir,
        method: SegMethod::default(),
        tier: SpTier::default(),
        mode: AggregateMode::default(),
        annotators: None,
    };

    while let Some(flag) = it.next() {
        let value = it.next().ok_or_else(|| format!("{flag} needs a value"))?;
        match flag.as_str() {
            "--method" => {
                args.method = SegMethod::from_name(&value)
                    .ok_or_else(|| format!("unknown method `{value}`"))?;
            }
            "--tier" => {
                args.tier = match value.as_str() {
                    "lower" => SpTier::Lower,
                    "higher" => SpTier::Higher,
                    _ => return Err(format!("unknown tier `{value}`")),
                };
            }
            "--mode" => {
                args.mode = match value.as_str() {
                    "manual" => AggregateMode::Manual,
                    "sp" => AggregateMode::Sp,
                    "both" => AggregateMode::Both,
                    _ => return Err(format!("unknown mode `{value}`")),
                };
            }
            "--annotators" => {
                args.annotators = Some(value.split(',').map(str::to_string).collect());
            }
            other => return Err(format!("unknown option `{other}`")),
        }
    }
    Ok(args)
}

/// 加载标注根目录下的所有标注者. 单个标注者读不到就跳过并提示,
/// 与历史行为一致.
fn load_annotators(
    root: &Path,
    meta: &VolumeMeta,
    method: SegMethod,
    tier: SpTier,
) -> Vec<AnnotatorMarks> {
    let names = match dataset::list_annotators(root) {
        Ok(names) => names,
        Err(e) => {
            println!("Cannot list annotators under {}: {e}", root.display());
            return vec![];
        }
    };

    let mut loaded = Vec::with_capacity(names.len());
    for name in names {
        let (sp, manual) = dataset::annotator_mark_paths(root, &name, meta, method, tier);
        match dataset::load_annotator_marks(&name, &sp, &manual, meta.shape()) {
            Ok(marks) => loaded.push(marks),
            Err(e) => println!("Skipping annotator {name}: {e:?}"),
        }
    }
    loaded
}

fn run(args: &Args) -> Result<(), String> {
    let meta = VolumeMeta::parse_path(&args.scan_file).map_err(|e| format!("{e:?}"))?;

    let mut scan = codec::read_u16_grid(&args.scan_file, meta.shape())
        .map_err(|e| format!("cannot read scan: {e:?}"))?;
    scan.rescale_to_full_range();

    let root = dataset::annotations_root(&args.scan_file);
    let annotators = load_annotators(&root, &meta, args.method, args.tier);
    let aggregator = AnnotationAggregator::new(meta.shape(), annotators)
        .map_err(|e| format!("inconsistent annotator data: {e:?}"))?;

    // 参与统计的标注者下标.
    let selected: Vec<usize> = match &args.annotators {
        None => (0..aggregator.len()).collect(),
        Some(wanted) => aggregator
            .names()
            .enumerate()
            .filter(|(_, name)| wanted.iter().any(|w| w == name))
            .map(|(i, _)| i)
            .collect(),
    };
    println!(
        "Patient {}: {} annotators available, {} selected.",
        meta.patient,
        aggregator.len(),
        selected.len(),
    );

    std::fs::create_dir_all(&args.out_dir).map_err(|e| e.to_string())?;

    let maps = aggregator.par_aggregate_all(&selected, args.mode);
    for (z, map) in maps.iter().enumerate() {
        let scan_out = args.out_dir.join(format!("scan_{z:03}.png"));
        scan.slice_at(z)
            .save(&scan_out)
            .map_err(|e| format!("cannot write {}: {e}", scan_out.display()))?;

        let map_out = args.out_dir.join(format!("agreement_{z:03}.png"));
        map.save(&map_out)
            .map_err(|e| format!("cannot write {}: {e}", map_out.display()))?;
    }

    println!(
        "Wrote {} slice pairs into {}.",
        maps.len(),
        args.out_dir.display(),
    );
    Ok(())
}

fn main() -> ExitCode {
    let args = match parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("Error: {e}\n{USAGE}");
            return ExitCode::FAILURE;
        }
    };

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
