use crate::PointerWidth;
use anyhow::{Context, Result};
use object::Endianness;
use serde_derive::{Deserialize, Serialize};
use target_lexicon::{Endianness as TargetEndianness, Triple};

/// Byte order relocation data is written in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ByteOrder {
    /// Least significant byte first.
    Little,
    /// Most significant byte first.
    Big,
}

impl ByteOrder {
    /// The byte order of the host.
    pub fn host() -> ByteOrder {
        if cfg!(target_endian = "big") {
            ByteOrder::Big
        } else {
            ByteOrder::Little
        }
    }

    /// This byte order as an `object` endianness.
    pub fn endianness(self) -> Endianness {
        match self {
            ByteOrder::Little => Endianness::Little,
            ByteOrder::Big => Endianness::Big,
        }
    }
}

/// Target parameters relocation data is produced for.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tunables {
    /// Pointer width of the target; fixes the layout of every record.
    pub pointer_width: PointerWidth,

    /// Byte order of every multi-byte field.
    pub byte_order: ByteOrder,

    /// Whether the code cache reaches distant methods through trampolines,
    /// in which case trampolines for inline-cache slots are reserved at load.
    pub needs_method_trampolines: bool,
}

// wrapped, so the settings live in a named table of a larger config file
#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct Config {
    relocations: TunablesConfig,
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct TunablesConfig {
    pointer_width: PointerWidth,
    #[serde(default = "ByteOrder::host")]
    byte_order: ByteOrder,
    needs_method_trampolines: Option<bool>,
}

impl Tunables {
    /// Returns the tunables for producing code that runs on the host.
    pub fn default_host() -> Tunables {
        Tunables::for_width(PointerWidth::host(), ByteOrder::host())
    }

    /// Returns the default tunables for the given target triple.
    pub fn default_for_target(target: &Triple) -> Result<Tunables> {
        let width = PointerWidth::for_triple(target)?;
        let byte_order = match target
            .endianness()
            .map_err(|_| anyhow::anyhow!("failed to retrieve target endianness"))?
        {
            TargetEndianness::Little => ByteOrder::Little,
            TargetEndianness::Big => ByteOrder::Big,
        };
        Ok(Tunables::for_width(width, byte_order))
    }

    fn for_width(pointer_width: PointerWidth, byte_order: ByteOrder) -> Tunables {
        Tunables {
            pointer_width,
            byte_order,
            // Only 64-bit code caches are too large for direct calls.
            needs_method_trampolines: pointer_width == PointerWidth::U64,
        }
    }

    /// Parses tunables from the `[relocations]` table of a TOML document.
    ///
    /// `pointer-width` is required; the byte order defaults to the host's
    /// and trampolines default to what the pointer width implies.
    pub fn from_toml(contents: &str) -> Result<Tunables> {
        let config = toml::from_str::<Config>(contents)
            .context("failed to parse relocation settings")?
            .relocations;
        let mut tunables = Tunables::for_width(config.pointer_width, config.byte_order);
        if let Some(needs) = config.needs_method_trampolines {
            tunables.needs_method_trampolines = needs;
        }
        log::trace!("relocation settings: {tunables:?}");
        Ok(tunables)
    }
}
