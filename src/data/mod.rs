pub mod tiff_stack;
pub mod volume;

#[cfg(test)]
pub mod test_support {
    //! Fixtures shared by the unit tests: scratch directories and synthetic
    //! MRC files written with the native writer.

    use std::path::{Path, PathBuf};

    use mrc_core::{Mode, MrcHeader, VoxelSize};
    use mrc_io::write_mrc_file;

    use super::volume::Frame;

    /// Fresh, empty directory under the system temp dir.
    pub fn scratch_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("mrc2tiff-test-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).expect("create scratch dir");
        dir
    }

    /// Write `frames` as a float32 MRC whose header voxel size is `voxel`.
    pub fn write_test_mrc(path: &Path, frames: &[Frame], voxel: f32) {
        let (w, h) = frames[0].dimensions();
        let mut header = MrcHeader::new(w as i32, h as i32, frames.len() as i32, Mode::Float32);
        header.set_voxel_size(VoxelSize {
            x: voxel,
            y: voxel,
            z: voxel,
        });
        let data: Vec<f32> = frames.iter().flat_map(|f| f.data().iter().copied()).collect();
        write_mrc_file(path, &header, &data).expect("write test mrc");
    }
}
