use std::path::Path;
use std::sync::Arc;

use anyhow::Context as _;
use faceid::{
    AddOutcome, Encoding, EncodingCache, HttpEncoder, MatchResult, RegistryManager,
    DEFAULT_DIMENSION,
};
use serde::Serialize;

use crate::config::CliConfig;
use crate::{CacheCommand, Cli, Commands};

#[derive(Debug, PartialEq, Serialize)]
struct MatchOutput {
    matched: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    distance: Option<f32>,
}

impl From<&MatchResult> for MatchOutput {
    fn from(res: &MatchResult) -> Self {
        match res {
            MatchResult::Matched { name, distance } => Self {
                matched: true,
                name: Some(name.clone()),
                distance: Some(*distance),
            },
            MatchResult::Unknown => Self {
                matched: false,
                name: None,
                distance: None,
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct CacheReport {
    path: String,
    version: String,
    model_type: String,
    faces: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    dimension: Option<usize>,
    usable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    problem: Option<String>,
}

#[derive(Serialize)]
struct AddOutput<'a> {
    name: &'a str,
    record: &'a str,
    replaced: bool,
    total: usize,
}

pub async fn run(cli: &Cli, cfg: &CliConfig) -> anyhow::Result<()> {
    if let Commands::Cache { command } = &cli.command {
        return run_cache(cli, cfg, command);
    }
    let manager = open_manager(cfg)?;

    match &cli.command {
        Commands::List => {
            let names = manager.list_identities().await?;
            if cli.json {
                return print_json(&names);
            }
            for name in &names {
                println!("{name}");
            }
            eprintln!("{} known identities", names.len());
        }
        Commands::Add { name, photo } => {
            let image = read_photo(photo)?;
            let AddOutcome {
                record,
                replaced,
                total,
            } = manager
                .add_identity(name, &image)
                .await
                .with_context(|| format!("add {name:?}"))?;
            if cli.json {
                return print_json(&AddOutput {
                    name,
                    record: &record,
                    replaced,
                    total,
                });
            }
            let verb = if replaced { "replaced" } else { "added" };
            println!("{verb} {name} as {record} ({total} known)");
        }
        Commands::Identify { photo } => {
            let image = read_photo(photo)?;
            let results = manager.identify(&image).await?;
            if cli.json {
                let out: Vec<MatchOutput> = results.iter().map(MatchOutput::from).collect();
                return print_json(&out);
            }
            if results.is_empty() {
                println!("no faces found");
            }
            for (i, res) in results.iter().enumerate() {
                println!("face {i}: {res}");
            }
        }
        Commands::Match { encoding } => {
            let data = std::fs::read(encoding)
                .with_context(|| format!("read {}", encoding.display()))?;
            let query: Encoding = serde_json::from_slice(&data)
                .with_context(|| format!("parse encoding {}", encoding.display()))?;
            let res = manager.match_encoding(&query).await?;
            if cli.json {
                return print_json(&MatchOutput::from(&res));
            }
            println!("{res}");
        }
        Commands::Rebuild => {
            let total = manager.reload().await?;
            if cli.json {
                return print_json(&serde_json::json!({ "total": total }));
            }
            println!("rebuilt registry: {total} identities");
        }
        Commands::Cache { command } => return run_cache(cli, cfg, command),
    }
    Ok(())
}

fn run_cache(cli: &Cli, cfg: &CliConfig, command: &CacheCommand) -> anyhow::Result<()> {
    match command {
        CacheCommand::Verify { path } => {
            let path = path
                .clone()
                .or_else(|| cfg.engine.cache_path.clone())
                .context("no cache file: pass a path or set cache_path")?;
            let enc = cfg.encoder_config();
            let dim = if enc.dimension == 0 {
                DEFAULT_DIMENSION
            } else {
                enc.dimension
            };
            let report = verify_cache(&path, &enc.model_type, dim)?;

            if cli.json {
                print_json(&report)?;
            } else {
                println!("path:       {}", report.path);
                println!("version:    {}", report.version);
                println!("model_type: {}", report.model_type);
                println!("faces:      {}", report.faces);
                match report.dimension {
                    Some(d) => println!("dimension:  {d}"),
                    None => println!("dimension:  -"),
                }
            }
            if let Some(problem) = report.problem {
                anyhow::bail!("cache not usable by the {} encoder: {problem}", enc.model_type);
            }
            if !cli.json {
                println!("usable by the {} encoder", enc.model_type);
            }
        }
    }
    Ok(())
}

/// Reads the cache at `path` and checks it against an encoder of
/// `model_type` producing `dim`-d encodings. Unreadable caches are errors;
/// readable but unusable ones are reported.
fn verify_cache(path: &Path, model_type: &str, dim: usize) -> anyhow::Result<CacheReport> {
    let cache = EncodingCache::read(path)
        .with_context(|| format!("read cache {}", path.display()))?;
    let problem = EncodingCache::load(path, model_type, dim)
        .err()
        .map(|e| e.to_string());
    Ok(CacheReport {
        path: path.display().to_string(),
        version: cache.version.clone(),
        model_type: cache.model_type.clone(),
        faces: cache.len(),
        dimension: cache.dimension(),
        usable: problem.is_none(),
        problem,
    })
}

fn open_manager(cfg: &CliConfig) -> anyhow::Result<RegistryManager> {
    let encoder = HttpEncoder::new(cfg.encoder_config())
        .context("encoder: set encoder.base_url or FACEID_ENCODER_URL")?;
    RegistryManager::from_config(&cfg.engine, Arc::new(encoder)).context("open registry")
}

fn read_photo(path: &Path) -> anyhow::Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("read photo {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn match_output_json() {
        let matched = MatchResult::Matched { name: "alice".into(), distance: 0.25 };
        let json = serde_json::to_value(MatchOutput::from(&matched)).unwrap();
        assert_eq!(json, serde_json::json!({"matched": true, "name": "alice", "distance": 0.25}));

        let json = serde_json::to_value(MatchOutput::from(&MatchResult::Unknown)).unwrap();
        assert_eq!(json, serde_json::json!({"matched": false}));
    }

    fn saved_cache(dir: &Path, model_type: &str) -> std::path::PathBuf {
        let path = dir.join("face_encodings.cache");
        EncodingCache::new(
            vec![Encoding::new(vec![0.0; 4]), Encoding::new(vec![1.0; 4])],
            vec!["alice".into(), "bob".into()],
            model_type,
            faceid::CACHE_FORMAT_VERSION,
        )
        .unwrap()
        .save(&path)
        .unwrap();
        path
    }

    #[test]
    fn verify_reports_usable_cache() {
        let dir = tempfile::tempdir().unwrap();
        let path = saved_cache(dir.path(), "hog");

        let report = verify_cache(&path, "hog", 4).unwrap();
        assert!(report.usable);
        assert_eq!(report.version, faceid::CACHE_FORMAT_VERSION);
        assert_eq!(report.model_type, "hog");
        assert_eq!(report.faces, 2);
        assert_eq!(report.dimension, Some(4));
    }

    #[test]
    fn verify_flags_other_model_and_dimension() {
        let dir = tempfile::tempdir().unwrap();
        let path = saved_cache(dir.path(), "hog");

        let report = verify_cache(&path, "cnn", 4).unwrap();
        assert!(!report.usable);
        assert!(report.problem.unwrap().contains("cnn"));

        let report = verify_cache(&path, "hog", 128).unwrap();
        assert!(!report.usable);
        assert_eq!(report.faces, 2);
    }

    #[test]
    fn verify_fails_on_unreadable_cache() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("face_encodings.cache");
        assert!(verify_cache(&path, "hog", 4).is_err());

        std::fs::write(&path, b"garbage").unwrap();
        assert!(verify_cache(&path, "hog", 4).is_err());
    }
}
