//! Working-directory layout for an editing run.
//!
//! Every intermediate artifact is named by its segment index, so parallel
//! workers never write the same file.
//!
//! ```text
//! <work_dir>/
//! ├── temp_audio.wav             source audio, silence segmentation only
//! ├── video_segment_{i}.mp4      raw sub-clip for segment i
//! ├── temp_audio{i}.wav          decoded sub-clip audio
//! ├── audio{i}.wav               cleaned, padded audio
//! ├── last_visual_frame{i}.jpg   boundary frame for segment i+1
//! ├── retimed{i}.mp4             synthesized clip before stitching
//! ├── output{i}_crossfade.mp4    transition into segment i (i > 0)
//! ├── output{i}.mp4              final body of segment i
//! └── vidlist.txt                concat list
//! ```

use std::path::{Path, PathBuf};

/// Handle on the working directory.
#[derive(Debug, Clone)]
pub struct WorkDir {
    root: PathBuf,
}

impl WorkDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the directory and remove anything left by a previous run.
    pub fn prepare(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.root)?;
        for entry in std::fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.is_dir() {
                std::fs::remove_dir_all(&path)?;
            } else {
                std::fs::remove_file(&path)?;
            }
        }
        Ok(())
    }

    /// Remove the directory and everything in it.
    pub fn cleanup(&self) -> std::io::Result<()> {
        if self.root.exists() {
            std::fs::remove_dir_all(&self.root)?;
        }
        Ok(())
    }

    /// Whole-recording audio decoded for silence detection.
    pub fn source_audio(&self) -> PathBuf {
        self.root.join("temp_audio.wav")
    }

    pub fn video_segment(&self, index: usize) -> PathBuf {
        self.root.join(format!("video_segment_{index}.mp4"))
    }

    pub fn temp_audio(&self, index: usize) -> PathBuf {
        self.root.join(format!("temp_audio{index}.wav"))
    }

    pub fn audio(&self, index: usize) -> PathBuf {
        self.root.join(format!("audio{index}.wav"))
    }

    pub fn boundary_frame(&self, index: usize) -> PathBuf {
        self.root.join(format!("last_visual_frame{index}.jpg"))
    }

    pub fn retimed(&self, index: usize) -> PathBuf {
        self.root.join(format!("retimed{index}.mp4"))
    }

    pub fn output(&self, index: usize) -> PathBuf {
        self.root.join(format!("output{index}.mp4"))
    }

    pub fn crossfade(&self, index: usize) -> PathBuf {
        self.root.join(format!("output{index}_crossfade.mp4"))
    }

    pub fn concat_list(&self) -> PathBuf {
        self.root.join("vidlist.txt")
    }

    /// Final clips in playback order:
    /// `output0, output1_crossfade, output1, output2_crossfade, output2, ...`.
    pub fn playback_order(&self, segment_count: usize) -> Vec<PathBuf> {
        let mut paths = Vec::with_capacity(segment_count.saturating_mul(2));
        for index in 0..segment_count {
            if index != 0 {
                paths.push(self.crossfade(index));
            }
            paths.push(self.output(index));
        }
        paths
    }
}
