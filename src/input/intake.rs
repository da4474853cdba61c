/// 上传文件校验与暂存
/// Upload gate: extension + header sniffing, then staging into a temp dir
use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{info, warn};

use crate::error::{PipelineError, Result};

/// 允许上传的视频类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoKind {
    Mp4,
    Avi,
    Mov,
}

impl VideoKind {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "mp4" => Some(VideoKind::Mp4),
            "avi" => Some(VideoKind::Avi),
            "mov" => Some(VideoKind::Mov),
            _ => None,
        }
    }

    /// 文件头是否符合该容器格式
    fn matches_header(self, bytes: &[u8]) -> bool {
        match self {
            // ISO BMFF: [size:4][type:4]
            VideoKind::Mp4 | VideoKind::Mov => bytes.get(4..8).is_some_and(|t| {
                [
                    b"ftyp", b"moov", b"mdat", b"free", b"wide", b"skip", b"pnot", b"uuid",
                    b"styp",
                ]
                    .iter()
                    .any(|box_type| t == *box_type)
            }),
            VideoKind::Avi => {
                bytes.get(0..4) == Some(&b"RIFF"[..]) && bytes.get(8..12) == Some(&b"AVI "[..])
            }
        }
    }
}

/// 上传的视频 (文件名 + 内容)
#[derive(Debug, Clone)]
pub struct VideoUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl VideoUpload {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self::new(file_name, fs::read(path)?))
    }

    /// 校验扩展名与文件头
    pub fn accept(&self) -> Result<VideoKind> {
        let ext = Path::new(&self.file_name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("");
        let kind = VideoKind::from_extension(ext).ok_or_else(|| {
            PipelineError::unsupported(&self.file_name, "only mp4, avi and mov are accepted")
        })?;

        if !kind.matches_header(&self.bytes) {
            return Err(PipelineError::unsupported(
                &self.file_name,
                format!("content is not a {:?} container", kind),
            ));
        }
        Ok(kind)
    }

    /// 校验后写入临时目录
    pub fn stage(&self) -> Result<StagedUpload> {
        self.accept()?;

        let dir = tempfile::Builder::new().prefix("pose-trend-").tempdir()?;
        // 只保留文件名部分, 防止路径穿越
        let name = Path::new(&self.file_name)
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "upload.mp4".into());
        let path = dir.path().join(name);
        fs::write(&path, &self.bytes)?;

        info!(
            "📥 视频已上传: {} ({} bytes) → {}",
            self.file_name,
            self.bytes.len(),
            path.display()
        );
        Ok(StagedUpload {
            path,
            dir: Some(dir),
        })
    }
}

/// 暂存在临时目录中的上传文件, 析构时删除整个目录
#[derive(Debug)]
pub struct StagedUpload {
    path: PathBuf,
    dir: Option<TempDir>,
}

impl StagedUpload {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 临时目录 (输出文件也可以放在这里)
    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_ref().map(|d| d.path())
    }
}

impl Drop for StagedUpload {
    fn drop(&mut self) {
        if let Some(dir) = self.dir.take() {
            let shown = dir.path().display().to_string();
            match dir.close() {
                Ok(()) => info!("🧹 临时文件已清理: {}", shown),
                Err(e) => warn!("⚠️ 临时目录清理失败 {}: {}", shown, e),
            }
        }
    }
}
