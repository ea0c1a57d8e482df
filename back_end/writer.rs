//! Writing derived relations: one tab-separated `<relation>.csv` per relation,
//! or one JSON document mapping relation names to their rows.

use std::collections::BTreeMap as Map;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use derive_more::Display;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::commons::{Error, Result};
use crate::middle_end::analysis::Analysis;

#[derive(Clone, Copy, Debug, Default, Display, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    #[display(fmt = "tsv")]
    Tsv,
    #[display(fmt = "json")]
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "tsv" => Ok(OutputFormat::Tsv),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("unknown output format `{s}`; expected tsv or json")),
        }
    }
}

/// Where output goes.  `-` on the command line means standard output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Destination {
    Stdout,
    Dir(PathBuf),
}

impl FromStr for Destination {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "" => Err("empty output directory".to_owned()),
            "-" => Ok(Destination::Stdout),
            _ => Ok(Destination::Dir(PathBuf::from(s))),
        }
    }
}

/// Every relation the analysis produced, by name.
pub fn relations(analysis: &Analysis) -> Map<&'static str, Vec<Vec<String>>> {
    analysis
        .schemas()
        .iter()
        .map(|s| (s.name, analysis.rows(s)))
        .collect()
}

pub fn write_tsv(rows: &[Vec<String>], w: &mut impl Write) -> std::io::Result<()> {
    for row in rows {
        writeln!(w, "{}", row.join("\t"))?;
    }
    Ok(())
}

pub fn write_json(analysis: &Analysis, w: &mut impl Write) -> std::io::Result<()> {
    serde_json::to_writer_pretty(&mut *w, &relations(analysis))?;
    writeln!(w)
}

/// Write `analysis` in `format` to `dest`.
pub fn emit(analysis: &Analysis, format: OutputFormat, dest: &Destination) -> Result<()> {
    match dest {
        Destination::Stdout => {
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            write_stream(analysis, format, &mut out).map_err(|e| Error::io("<stdout>", e))
        }
        Destination::Dir(dir) => write_dir(analysis, format, dir),
    }
}

// On a stream, TSV rows carry the relation name as their first column so the
// relations can be told apart.
fn write_stream(analysis: &Analysis, format: OutputFormat, w: &mut impl Write) -> std::io::Result<()> {
    match format {
        OutputFormat::Json => write_json(analysis, w),
        OutputFormat::Tsv => {
            for (name, rows) in relations(analysis) {
                for row in rows {
                    writeln!(w, "{name}\t{}", row.join("\t"))?;
                }
            }
            Ok(())
        }
    }
}

pub fn write_dir(analysis: &Analysis, format: OutputFormat, dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;

    match format {
        OutputFormat::Json => {
            let path = dir.join("relations.json");
            let mut file = create(&path)?;
            write_json(analysis, &mut file)
                .and_then(|_| file.flush())
                .map_err(|e| Error::io(&path, e))?;
            info!(path = %path.display(), "wrote relations");
        }
        OutputFormat::Tsv => {
            for (name, rows) in relations(analysis) {
                let path = dir.join(format!("{name}.csv"));
                let mut file = create(&path)?;
                write_tsv(&rows, &mut file)
                    .and_then(|_| file.flush())
                    .map_err(|e| Error::io(&path, e))?;
                info!(relation = name, rows = rows.len(), path = %path.display(), "wrote relation");
            }
        }
    }

    Ok(())
}

fn create(path: &Path) -> Result<std::io::BufWriter<std::fs::File>> {
    std::fs::File::create(path)
        .map(std::io::BufWriter::new)
        .map_err(|e| Error::io(path, e))
}
