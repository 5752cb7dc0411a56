/// Application controller
///
/// Front ends never call the pipeline directly: they build an `Action` and
/// hand it to `dispatch`, which runs it against the session's cancel token and
/// reproducibility log.

use std::path::PathBuf;

use crate::error::ConvertError;
use crate::log::reproducibility::ReproLog;
use crate::pipeline::conversion::{convert_batch, BatchReport, CancelToken, ConversionRequest};
use crate::pipeline::preview::{write_preview, PreviewRequest};

/// Actions a front end can trigger
#[derive(Debug, Clone)]
pub enum Action {
    Convert(ConversionRequest),
    Preview(PreviewRequest),
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::Convert(_) => "convert",
            Action::Preview(_) => "preview",
        }
    }
}

#[derive(Debug)]
pub enum Outcome {
    Converted(BatchReport),
    Previewed(PathBuf),
}

impl Outcome {
    /// False when any file of a batch failed.
    pub fn is_success(&self) -> bool {
        match self {
            Outcome::Converted(report) => !report.has_failures(),
            Outcome::Previewed(_) => true,
        }
    }
}

pub fn dispatch(
    action: Action,
    cancel: &CancelToken,
    log: &mut ReproLog,
) -> Result<Outcome, ConvertError> {
    log::debug!("Dispatching {}", action.name());
    match action {
        Action::Convert(request) => {
            if log.source.is_empty() {
                log.set_source(&format!("{} input file(s)", request.inputs.len()));
            }
            convert_batch(&request, cancel, log).map(Outcome::Converted)
        }
        Action::Preview(request) => {
            if log.source.is_empty() {
                log.set_source(&request.input.display().to_string());
            }
            write_preview(&request, log).map(Outcome::Previewed)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::test_support::{scratch_dir, write_test_mrc};
    use crate::data::volume::{Frame, VoxelUnit};
    use crate::pipeline::conversion::ConversionOptions;
    use crate::pipeline::resize::TargetSize;

    #[test]
    fn test_dispatch_convert() {
        let dir = scratch_dir();
        let input = dir.join("a.mrc");
        write_test_mrc(&input, &[Frame::filled(4, 4, 1.0)], 10.0);

        let action = Action::Convert(ConversionRequest {
            inputs: vec![input],
            output_dir: Some(dir.join("out")),
            options: ConversionOptions::default(),
        });
        let mut log = ReproLog::new();
        let outcome = dispatch(action, &CancelToken::new(), &mut log).unwrap();

        assert!(outcome.is_success());
        assert!(matches!(outcome, Outcome::Converted(ref r) if r.converted() == 1));
        assert_eq!(log.source, "1 input file(s)");
    }

    #[test]
    fn test_dispatch_convert_reports_failure() {
        let dir = scratch_dir();
        let action = Action::Convert(ConversionRequest {
            inputs: vec![dir.join("missing.mrc")],
            output_dir: Some(dir.join("out")),
            options: ConversionOptions::default(),
        });
        let outcome = dispatch(action, &CancelToken::new(), &mut ReproLog::new()).unwrap();
        assert!(!outcome.is_success());
    }

    #[test]
    fn test_dispatch_preview() {
        let dir = scratch_dir();
        let input = dir.join("p.mrc");
        write_test_mrc(&input, &[Frame::from_fn(30, 20, |x, _| x as f32)], 40.0);

        let action = Action::Preview(PreviewRequest {
            input: input.clone(),
            frame: 0,
            size: Some(TargetSize::new(15, 10).unwrap()),
            pixel_size_nm: None,
            voxel_unit: VoxelUnit::Nm,
            output: dir.join("p.png"),
        });
        assert_eq!(action.name(), "preview");
        let mut log = ReproLog::new();
        let outcome = dispatch(action, &CancelToken::new(), &mut log).unwrap();
        assert!(matches!(outcome, Outcome::Previewed(ref p) if p.exists()));
        assert_eq!(log.source, input.display().to_string());
    }
}
