//! Parsing of position-resolved motif insertion sites.
//!
//! Catalog ingestion (RIN, DESC, JAR3D output) lives upstream; this
//! driver only accepts sites already mapped onto the input sequence, one
//! per line:
//!
//! ```text
//! source,identifier,score,start1,end1[,start2,end2,...]
//! ```
//!
//! with half-open `[start, end)` component intervals and `source` one of
//! `rna3dmotif`, `atlas` or `carnaval`. Blank lines and `#` comments are
//! ignored.

use motifold_core::motif::{Component, Motif, MotifSource};
use motifold_core::types::MotifoldError;

/// Parse a sites file.
///
/// # Errors
///
/// [`MotifoldError::InvalidMotif`] on malformed lines.
pub fn parse_sites(text: &str) -> Result<Vec<Motif>, MotifoldError> {
    let mut sites = Vec::new();
    for (lineno, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        sites.push(parse_line(line).map_err(|msg| {
            MotifoldError::InvalidMotif(format!("line {}: {msg}", lineno + 1))
        })?);
    }
    Ok(sites)
}

fn parse_line(line: &str) -> Result<Motif, String> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    if fields.len() < 5 {
        return Err(format!(
            "expected `source,identifier,score,start,end,...`, got {line:?}"
        ));
    }
    let identifier = fields[1].to_string();
    let source = match fields[0].to_ascii_lowercase().as_str() {
        "rna3dmotif" => MotifSource::Rna3dMotif { pdb_id: identifier },
        "atlas" | "rnamotifatlas" => MotifSource::RnaMotifAtlas {
            atlas_id: identifier,
        },
        "carnaval" => {
            let rin_id = identifier
                .trim_start_matches("RIN")
                .parse()
                .map_err(|e| format!("bad CaRNAval id {identifier:?}: {e}"))?;
            MotifSource::Carnaval { rin_id }
        }
        other => return Err(format!("unknown motif source {other:?}")),
    };
    let score: f64 = fields[2]
        .parse()
        .map_err(|e| format!("bad score {:?}: {e}", fields[2]))?;

    let positions = &fields[3..];
    if positions.len() % 2 != 0 {
        return Err("component positions must come in start,end pairs".into());
    }
    let mut components = Vec::with_capacity(positions.len() / 2);
    for pair in positions.chunks(2) {
        let start: usize = pair[0]
            .parse()
            .map_err(|e| format!("bad position {:?}: {e}", pair[0]))?;
        let end: usize = pair[1]
            .parse()
            .map_err(|e| format!("bad position {:?}: {e}", pair[1]))?;
        if end <= start {
            return Err(format!("empty component {start},{end}"));
        }
        components.push(Component::new(start, end));
    }
    Ok(Motif::new(source, components, score))
}
