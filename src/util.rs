use {
    crate::components::Transition,
    anyhow::{
        Context,
        Result,
    },
    ron::ser::{
        to_string_pretty,
        PrettyConfig,
    },
    serde::{
        de::DeserializeOwned,
        Serialize,
    },
    std::{
        fs,
        path::Path,
    },
};


/// Write a config to a file in the RON format.
pub fn write_config<C, P>(
    config: &C,
    path: P,
) -> Result<()>
where
    C: Serialize,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    fs::write(path, to_string_pretty(config, PrettyConfig::default())?)
        .with_context(|| format!("Could not write config to {}", path.display()))
}

/// Read a config from a RON file.
pub fn read_config<C, P>(path: P) -> Result<C>
where
    C: DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let text = fs::read_to_string(path)
        .with_context(|| format!("Could not read config from {}", path.display()))?;
    ron::from_str(&text).with_context(|| format!("Could not parse config in {}", path.display()))
}

/// Read a list of demonstration transitions from a RON file.
pub fn read_demos<P: AsRef<Path>>(path: P) -> Result<Vec<Transition>> {
    read_config(path)
}
