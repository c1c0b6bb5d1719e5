// # Record Name Derivation
//
// Turns `ADF_RECORDS` entries into DNS names:
//
// - `www.example.com`: used verbatim
// - `/pattern/replacement/`: regex substitution on the short hostname
//   (`$1` refers to the first capture group); a result without a dot gets
//   `.<zone>` appended when a zone is configured
//
// With no entries, the name is the short hostname without its last
// `-suffix`, in the configured zone: host `web-03` in zone `example.com`
// manages `web.example.com`.

use anyhow::{Context, Result, bail};
use regex::Regex;

/// Derive the managed record names for `hostname`
pub fn derive_record_names(
    entries: &[String],
    hostname: Option<&str>,
    zone: Option<&str>,
) -> Result<Vec<String>> {
    let zone = zone.map(|z| z.trim_matches('.')).filter(|z| !z.is_empty());
    let short = hostname.map(short_hostname);

    let mut names = Vec::new();

    if entries.is_empty() {
        let (Some(short), Some(zone)) = (short, zone) else {
            bail!(
                "ADF_RECORDS is empty and no name can be derived. \
                Set ADF_RECORDS=www.example.com, or set ADF_ZONE (and ADF_HOSTNAME if needed)"
            );
        };
        let pool = short.rsplit_once('-').map_or(short, |(pool, _)| pool);
        names.push(format!("{}.{}", pool, zone));
    }

    for entry in entries {
        let name = match parse_substitution(entry) {
            Some((pattern, replacement)) => {
                let Some(short) = short else {
                    bail!(
                        "ADF_RECORDS entry '{}' needs a hostname. Set ADF_HOSTNAME",
                        entry
                    );
                };
                let regex = Regex::new(pattern)
                    .with_context(|| format!("Invalid pattern in ADF_RECORDS entry '{}'", entry))?;
                let substituted = regex.replace(short, replacement).into_owned();
                match zone {
                    Some(zone) if !substituted.contains('.') => format!("{}.{}", substituted, zone),
                    _ => substituted,
                }
            }
            None => entry.clone(),
        };

        let name = name.trim_end_matches('.').to_string();
        if !names.contains(&name) {
            names.push(name);
        }
    }

    Ok(names)
}

/// Hostname up to the first dot
fn short_hostname(hostname: &str) -> &str {
    let hostname = hostname.trim();
    hostname.split('.').next().unwrap_or(hostname)
}

/// Split `/pattern/replacement/` into its parts
fn parse_substitution(entry: &str) -> Option<(&str, &str)> {
    entry
        .strip_prefix('/')?
        .strip_suffix('/')?
        .split_once('/')
}
