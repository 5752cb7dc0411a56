/// Settings file
///
/// A JSON document holding the defaults for `convert`. Every field is
/// optional; flags given on the command line win over the file.
///
/// ```json
/// {
///   "output_dir": "tiff",
///   "conversion": { "resolution": "1280x720", "denoise": true, "jobs": 4 },
///   "log_file": "session.sh"
/// }
/// ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConvertError;
use crate::pipeline::conversion::ConversionOptions;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub output_dir: Option<PathBuf>,
    pub conversion: ConversionOptions,
    /// Where the reproducibility log is saved (`.json`, `.sh` or text)
    pub log_file: Option<PathBuf>,
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self, ConvertError> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| ConvertError::Config(format!("Read error {}: {}", path.display(), e)))?;
        let settings: Settings = serde_json::from_str(&json)
            .map_err(|e| ConvertError::Config(format!("Parse error {}: {}", path.display(), e)))?;
        settings.validate()?;
        log::info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Reject values no run could use.
    pub fn validate(&self) -> Result<(), ConvertError> {
        if self.conversion.jobs == 0 {
            return Err(ConvertError::Config("jobs must be at least 1".to_string()));
        }
        if let Some(px) = self.conversion.pixel_size_nm {
            if !px.is_finite() || px <= 0.0 {
                return Err(ConvertError::InvalidCalibration(px));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::test_support::scratch_dir;
    use crate::data::volume::VoxelUnit;
    use crate::pipeline::conversion::{Resolution, SampleFormat};

    #[test]
    fn test_partial_file_uses_defaults() {
        let path = scratch_dir().join("settings.json");
        std::fs::write(
            &path,
            r#"{ "conversion": { "resolution": "640x480", "smooth": true } }"#,
        )
        .unwrap();

        let s = Settings::load(&path).unwrap();
        assert_eq!(s.output_dir, None);
        assert_eq!(s.conversion.resolution, Resolution::Vga);
        assert!(s.conversion.smooth);
        assert!(!s.conversion.denoise);
        assert_eq!(s.conversion.sample_format, SampleFormat::F32);
        assert_eq!(s.conversion.jobs, 1);
    }

    #[test]
    fn test_written_settings_load_back() {
        let path = scratch_dir().join("settings.json");
        let mut s = Settings::default();
        s.output_dir = Some(PathBuf::from("/tmp/out"));
        s.conversion.scale_bar = true;
        s.conversion.pixel_size_nm = Some(0.85);
        s.conversion.voxel_unit = VoxelUnit::Angstrom;
        s.log_file = Some(PathBuf::from("run.json"));
        std::fs::write(&path, serde_json::to_string_pretty(&s).unwrap()).unwrap();
        assert_eq!(Settings::load(&path).unwrap(), s);
    }

    #[test]
    fn test_rejects_bad_values() {
        let dir = scratch_dir();
        let cases = [
            ("jobs.json", r#"{ "conversion": { "jobs": 0 } }"#),
            ("px.json", r#"{ "conversion": { "pixel_size_nm": -2.0 } }"#),
            ("res.json", r#"{ "conversion": { "resolution": "800x600" } }"#),
            ("broken.json", "{ not json"),
        ];
        for (name, body) in cases {
            let path = dir.join(name);
            std::fs::write(&path, body).unwrap();
            assert!(Settings::load(&path).is_err(), "{} should be rejected", name);
        }
        assert!(matches!(
            Settings::load(&dir.join("missing.json")),
            Err(ConvertError::Config(_))
        ));
    }
}
