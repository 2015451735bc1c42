use crate::cli::CollectArgs;
use crate::error::{CliError, Result};
use fraggen::core::{
    fragspace::FragmentSpace,
    io::{record::RecordFile, report, traits::StructureFile},
    models::{candidate::Candidate, ids::IdGenerator},
};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const OUTPUT_SUFFIX: &str = "_FIT.txt";

pub fn run(args: CollectArgs) -> Result<()> {
    let space = FragmentSpace::load(&args.library)?;
    let files = output_files(&args.work_dir)?;
    info!("Found {} fitness output file(s) in {:?}", files.len(), &args.work_dir);

    let ids = IdGenerator::new();
    let mut candidates = Vec::new();
    let mut skipped = 0usize;
    for path in &files {
        match read_candidate(path, &space, &ids, args.allow_no_uid) {
            Ok(candidate) => candidates.push(candidate),
            Err(e) => {
                skipped += 1;
                warn!("Skipping {:?}: {}", path, e);
            }
        }
    }

    candidates.sort_by(|a, b| b.cmp(a));
    report::write_report(&candidates, &args.output)?;
    println!(
        "Collected {} candidate(s), skipped {}. Report written to: {}",
        candidates.len(),
        skipped,
        args.output.display()
    );
    Ok(())
}

fn output_files(work_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(work_dir)? {
        let path = entry?.path();
        let is_output = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(OUTPUT_SUFFIX));
        if is_output && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn read_candidate(
    path: &Path,
    space: &FragmentSpace,
    ids: &IdGenerator,
    allow_no_uid: bool,
) -> Result<Candidate> {
    let record = RecordFile::read_from_path(path).map_err(|e| CliError::FileParsing {
        path: path.to_path_buf(),
        source: e.into(),
    })?;
    Candidate::from_record(&record, Some(path), space, ids, allow_no_uid).map_err(|e| {
        CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        }
    })
}
