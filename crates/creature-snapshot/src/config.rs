use anyhow::{Context, Result};

/// Command-line options for a snapshot run.
///
/// ```text
/// creature-snapshot [--size WIDTHxHEIGHT] [--frames N] [--msaa N]
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotConfig {
    pub width: u32,
    pub height: u32,
    /// Frames rendered back to back; each one re-records both batches.
    pub frames: u64,
    pub sample_count: u32,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            frames: 3,
            sample_count: 1,
        }
    }
}

impl SnapshotConfig {
    pub fn from_args<I>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let mut config = Self::default();
        let mut args = args.into_iter();

        while let Some(flag) = args.next() {
            let mut value = || args.next().with_context(|| format!("`{flag}` expects a value"));

            match flag.as_str() {
                "--size" => {
                    let raw = value()?;
                    let (w, h) = raw
                        .split_once('x')
                        .with_context(|| format!("`--size {raw}` is not WIDTHxHEIGHT"))?;
                    config.width = w.parse().with_context(|| format!("bad width `{w}`"))?;
                    config.height = h.parse().with_context(|| format!("bad height `{h}`"))?;
                }
                "--frames" => {
                    let raw = value()?;
                    config.frames = raw
                        .parse()
                        .with_context(|| format!("bad frame count `{raw}`"))?;
                }
                "--msaa" => {
                    let raw = value()?;
                    config.sample_count = raw
                        .parse()
                        .with_context(|| format!("bad sample count `{raw}`"))?;
                }
                other => anyhow::bail!("unknown argument `{other}`"),
            }
        }

        anyhow::ensure!(config.width > 0 && config.height > 0, "snapshot size must be non-zero");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<SnapshotConfig> {
        SnapshotConfig::from_args(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn no_args_gives_defaults() {
        assert_eq!(parse(&[]).unwrap(), SnapshotConfig::default());
    }

    #[test]
    fn parses_all_flags() {
        let c = parse(&["--size", "320x200", "--frames", "10", "--msaa", "4"]).unwrap();
        assert_eq!((c.width, c.height, c.frames, c.sample_count), (320, 200, 10, 4));
    }

    #[test]
    fn rejects_bad_input() {
        assert!(parse(&["--size", "320"]).is_err());
        assert!(parse(&["--size", "0x10"]).is_err());
        assert!(parse(&["--frames"]).is_err());
        assert!(parse(&["--wat"]).is_err());
    }
}
