//! Tile file naming: `{prefix}_{suffix}_{NN}`.

use crate::tile::SplitTile;
use tracing::debug;

const SEPARATOR: char = '_';

/// Which tiles a rename touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamingScope {
    /// Every tile in the list.
    All,
    /// The tile at this position in the list.
    Current(usize),
}

/// The half of a name being changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameField {
    Prefix,
    Suffix,
}

/// Builds `{prefix}_{suffix}_{NN}` where `NN` is `index + 1`, zero padded to
/// two digits.
///
/// # Example
/// ```
/// use gridsplit::compose_name;
///
/// assert_eq!(compose_name("cat", "happy", 0), "cat_happy_01");
/// assert_eq!(compose_name("cat", "sad", 11), "cat_sad_12");
/// ```
pub fn compose_name(prefix: &str, suffix: &str, index: usize) -> String {
    format!("{prefix}{SEPARATOR}{suffix}{SEPARATOR}{:02}", index + 1)
}

/// Makes `name` safe to use as one path component.
///
/// Path separators and control characters become `-`, and a name that is
/// empty or made only of dots becomes `-`, so the result can never leave the
/// directory it is joined to.
///
/// # Example
/// ```
/// use gridsplit::file_name_component;
///
/// assert_eq!(file_name_component("cat_happy_01"), "cat_happy_01");
/// assert_eq!(file_name_component("../../etc/passwd"), "..-..-etc-passwd");
/// assert_eq!(file_name_component(".."), "-");
/// ```
pub fn file_name_component(name: &str) -> String {
    if name.chars().all(|c| c == '.') {
        return "-".to_string();
    }
    name.chars()
        .map(|c| match c {
            '/' | '\\' => '-',
            c if c.is_control() => '-',
            c => c,
        })
        .collect()
}

/// Prefix and suffix recovered from an existing file name.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NameParts<'a> {
    pub prefix: Option<&'a str>,
    pub suffix: Option<&'a str>,
}

impl<'a> NameParts<'a> {
    /// Splits a name shaped like `prefix_suffix_NN`.
    ///
    /// A trailing all-digit segment is the sequence number and is ignored.
    /// The prefix is the text before the first separator and the suffix the
    /// text after it. A name without any separator yields neither part, and
    /// a name with a single part before the number (such as `Tile_01`)
    /// yields only a prefix.
    ///
    /// Separators are not escaped, so a prefix that itself contains `_`
    /// cannot be recovered: `my_cat_happy_01` parses as prefix `my` and
    /// suffix `cat_happy`.
    ///
    /// # Example
    /// ```
    /// use gridsplit::NameParts;
    ///
    /// let parts = NameParts::parse("cat_happy_03");
    /// assert_eq!((parts.prefix, parts.suffix), (Some("cat"), Some("happy")));
    ///
    /// let parts = NameParts::parse("Tile_01");
    /// assert_eq!((parts.prefix, parts.suffix), (Some("Tile"), None));
    ///
    /// assert_eq!(NameParts::parse("untitled"), NameParts::default());
    /// ```
    pub fn parse(name: &'a str) -> Self {
        if !name.contains(SEPARATOR) {
            return Self::default();
        }
        let stem = match name.rsplit_once(SEPARATOR) {
            Some((stem, number))
                if !number.is_empty() && number.chars().all(|c| c.is_ascii_digit()) =>
            {
                stem
            }
            _ => name,
        };
        match stem.split_once(SEPARATOR) {
            Some((prefix, suffix)) => Self {
                prefix: Some(prefix),
                suffix: Some(suffix),
            },
            None => Self {
                prefix: Some(stem),
                suffix: None,
            },
        }
    }
}

/// Rebuilds a tile's name with a new prefix, keeping its current suffix
/// (or `default_suffix` when the name carries none).
pub fn rename_prefix(tile: &mut SplitTile, prefix: &str, default_suffix: &str) {
    let name = {
        let parts = NameParts::parse(&tile.file_name);
        compose_name(prefix, parts.suffix.unwrap_or(default_suffix), tile.index)
    };
    tile.file_name = name;
}

/// Rebuilds a tile's name with a new suffix, keeping its current prefix
/// (or `default_prefix` when the name carries none).
pub fn rename_suffix(tile: &mut SplitTile, suffix: &str, default_prefix: &str) {
    let name = {
        let parts = NameParts::parse(&tile.file_name);
        compose_name(parts.prefix.unwrap_or(default_prefix), suffix, tile.index)
    };
    tile.file_name = name;
}

/// Selects the tiles a scope refers to. An out-of-range `Current` position
/// selects nothing.
pub fn scoped_tiles(tiles: &mut [SplitTile], scope: NamingScope) -> &mut [SplitTile] {
    match scope {
        NamingScope::All => tiles,
        NamingScope::Current(position) => match tiles.get_mut(position..=position) {
            Some(one) => one,
            None => {
                debug!("No tile at position {} to rename", position);
                &mut []
            }
        },
    }
}
