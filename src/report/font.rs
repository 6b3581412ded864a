//! Font registration for chart text.
//!
//! Charts are drawn with `ab_glyph`, which needs the TTF bytes registered up
//! front under the family name the charts ask for. Without a usable font the
//! charts are still drawn, just without captions, ticks or legends.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use ab_glyph::FontRef;
use plotters::style::{FontStyle, register_font};
use tracing::{debug, info, warn};

pub const FONT_FAMILY: &str = "sans-serif";

const SYSTEM_FONTS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/noto/NotoSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

static REGISTERED: OnceLock<Option<PathBuf>> = OnceLock::new();

/// Registers a chart font once per process and returns the file it came from.
///
/// `preferred` is tried first, then a list of common system locations. The
/// first call decides; later calls return the same answer.
pub fn ensure_font(preferred: Option<&Path>) -> Option<PathBuf> {
    REGISTERED
        .get_or_init(|| {
            let candidates = preferred
                .map(Path::to_path_buf)
                .into_iter()
                .chain(SYSTEM_FONTS.iter().map(PathBuf::from));

            for path in candidates {
                if try_register(&path) {
                    info!(font = %path.display(), "Chart font registered");
                    return Some(path);
                }
            }
            warn!("No usable chart font found, charts will be drawn without text");
            None
        })
        .clone()
}

fn try_register(path: &Path) -> bool {
    let Some(bytes) = read_font(path) else {
        return false;
    };
    // plotters keeps the font for the life of the process
    let bytes: &'static [u8] = Box::leak(bytes.into_boxed_slice());
    match register_font(FONT_FAMILY, FontStyle::Normal, bytes) {
        Ok(()) => true,
        Err(_) => {
            warn!(font = %path.display(), "Font rejected by the chart backend");
            false
        }
    }
}

/// Reads `path` and returns its bytes if they parse as a font.
fn read_font(path: &Path) -> Option<Vec<u8>> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            debug!(font = %path.display(), error = %e, "Font not readable");
            return None;
        }
    };
    if let Err(e) = FontRef::try_from_slice(&bytes) {
        debug!(font = %path.display(), error = %e, "Not a usable TrueType font");
        return None;
    }
    Some(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unreadable_font_is_rejected() {
        assert!(!try_register(Path::new("/nonexistent/font.ttf")));
    }

    #[test]
    fn test_garbage_font_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.ttf");
        std::fs::write(&path, b"not a font").unwrap();
        assert!(read_font(&path).is_none());
        assert!(!try_register(&path));
    }

    #[test]
    fn test_system_fonts_that_exist_parse() {
        for path in SYSTEM_FONTS.iter().map(Path::new).filter(|p| p.exists()) {
            assert!(read_font(path).is_some(), "{} did not parse", path.display());
        }
    }
}
