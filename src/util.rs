use {
    anyhow::Result,
    serde::Serialize,
    std::{
        fs::File,
        io::Write,
        path::PathBuf,
    },
};

/// Write a config struct to a file in pretty RON format.
pub fn write_config<C: Serialize>(
    config: &C,
    path: PathBuf,
) -> Result<()> {
    File::create(path)?.write_all(
        ron::ser::to_string_pretty(
            config,
            ron::ser::PrettyConfig::default(),
        )?
        .as_bytes(),
    )?;
    Ok(())
}
