//! 文件操作辅助函数
//!
//! 删除（不存在时忽略）、修改时间读写等安装步骤与更新器共用的操作。

use std::fs;
use std::io;
use std::path::Path;
use std::time::SystemTime;

/// 删除文件，文件不存在时视为成功
pub fn remove_file_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// 读取文件修改时间，文件不存在时返回 `None`
pub fn modified_time(path: &Path) -> io::Result<Option<SystemTime>> {
    match fs::metadata(path) {
        Ok(metadata) => metadata.modified().map(Some),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// 将文件修改时间设为指定时间（文件不存在时创建空文件）
pub fn touch(path: &Path, time: SystemTime) -> io::Result<()> {
    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    file.set_modified(time)
}
