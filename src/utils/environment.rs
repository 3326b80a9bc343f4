//! 用户级环境变量存储
//!
//! - Windows：`HKCU\Environment`，写入后广播 `WM_SETTINGCHANGE`
//! - 其他平台：当前进程环境变量
//! - 测试：[`MemoryEnvironment`]

use crate::core::error::{InstallerError, InstallerResult};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// 环境变量读写接口
pub trait EnvironmentStore: Send + Sync {
    fn get(&self, name: &str) -> InstallerResult<Option<String>>;

    fn set(&self, name: &str, value: &str) -> InstallerResult<()>;
}

/// 当前用户的环境变量
#[derive(Debug, Default, Clone, Copy)]
pub struct UserEnvironment;

impl EnvironmentStore for UserEnvironment {
    fn get(&self, name: &str) -> InstallerResult<Option<String>> {
        platform::get(name)
            .map_err(|e| InstallerError::Environment(format!("读取 {name} 失败: {e}")))
    }

    fn set(&self, name: &str, value: &str) -> InstallerResult<()> {
        platform::set(name, value)
            .map_err(|e| InstallerError::Environment(format!("写入 {name} 失败: {e}")))?;
        tracing::debug!(name = %name, "用户环境变量已更新");
        Ok(())
    }
}

#[cfg(target_os = "windows")]
mod platform {
    use std::io;
    use winreg::{enums::*, RegKey, RegValue};

    const ENVIRONMENT_KEY: &str = "Environment";

    pub fn get(name: &str) -> io::Result<Option<String>> {
        let hkcu = RegKey::predef(HKEY_CURRENT_USER);
        let key = hkcu.open_subkey(ENVIRONMENT_KEY)?;
        // 原样读取，不展开 %VAR%
        match key.get_raw_value(name) {
            Ok(value) => Ok(Some(super::decode_registry_string(&value.bytes))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn set(name: &str, value: &str) -> io::Result<()> {
        let hkcu = RegKey::predef(HKEY_CURRENT_USER);
        let (key, _) = hkcu.create_subkey(ENVIRONMENT_KEY)?;

        // 沿用原值类型；不存在时使用 REG_EXPAND_SZ，保证 %VAR% 条目可以展开
        let vtype = match key.get_raw_value(name) {
            Ok(existing) => match existing.vtype {
                REG_SZ => REG_SZ,
                _ => REG_EXPAND_SZ,
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => REG_EXPAND_SZ,
            Err(e) => return Err(e),
        };

        key.set_raw_value(
            name,
            &RegValue {
                bytes: super::encode_registry_string(value).into(),
                vtype,
            },
        )?;
        broadcast_environment_change();
        Ok(())
    }

    /// 通知其他进程（资源管理器等）重新加载环境变量
    fn broadcast_environment_change() {
        use windows_sys::Win32::UI::WindowsAndMessaging::{
            SendMessageTimeoutW, HWND_BROADCAST, SMTO_ABORTIFHUNG, WM_SETTINGCHANGE,
        };

        let parameter: Vec<u16> = "Environment".encode_utf16().chain(Some(0)).collect();
        let mut result: usize = 0;
        unsafe {
            SendMessageTimeoutW(
                HWND_BROADCAST,
                WM_SETTINGCHANGE,
                0,
                parameter.as_ptr() as isize,
                SMTO_ABORTIFHUNG,
                5000,
                &mut result,
            );
        }
    }
}

#[cfg(not(target_os = "windows"))]
mod platform {
    use std::io;

    pub fn get(name: &str) -> io::Result<Option<String>> {
        match std::env::var(name) {
            Ok(value) => Ok(Some(value)),
            Err(std::env::VarError::NotPresent) => Ok(None),
            Err(e) => Err(io::Error::new(io::ErrorKind::InvalidData, e)),
        }
    }

    pub fn set(name: &str, value: &str) -> io::Result<()> {
        std::env::set_var(name, value);
        Ok(())
    }
}

/// 编码为注册表字符串值（UTF-16LE，以 NUL 结尾）
#[cfg_attr(not(target_os = "windows"), allow(dead_code))]
pub(crate) fn encode_registry_string(value: &str) -> Vec<u8> {
    value
        .encode_utf16()
        .chain(Some(0))
        .flat_map(u16::to_le_bytes)
        .collect()
}

/// 解码注册表字符串值，截止到第一个 NUL
#[cfg_attr(not(target_os = "windows"), allow(dead_code))]
pub(crate) fn decode_registry_string(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .take_while(|&unit| unit != 0)
        .collect();
    String::from_utf16_lossy(&units)
}

/// 内存中的环境变量（克隆共享同一份数据）
#[derive(Debug, Default, Clone)]
pub struct MemoryEnvironment {
    vars: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_var(self, name: &str, value: &str) -> Self {
        self.lock().insert(name.to_string(), value.to_string());
        self
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        // 锁中毒时仍可安全读取数据
        self.vars.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl EnvironmentStore for MemoryEnvironment {
    fn get(&self, name: &str) -> InstallerResult<Option<String>> {
        Ok(self.lock().get(name).cloned())
    }

    fn set(&self, name: &str, value: &str) -> InstallerResult<()> {
        self.lock().insert(name.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_environment_is_shared_between_clones() {
        let env = MemoryEnvironment::new().with_var("PATH", "C:\\Windows");
        let other = env.clone();

        other.set("PATH", "C:\\Tools").unwrap();
        assert_eq!(env.get("PATH").unwrap().as_deref(), Some("C:\\Tools"));
        assert_eq!(env.get("MISSING").unwrap(), None);
    }

    #[test]
    fn registry_string_keeps_unexpanded_variables() {
        let value = r"%USERPROFILE%\bin;C:\MyApp";
        let bytes = encode_registry_string(value);

        assert_eq!(bytes.len(), (value.len() + 1) * 2);
        assert_eq!(&bytes[..4], &[b'%', 0, b'U', 0]);
        assert_eq!(&bytes[bytes.len() - 2..], &[0, 0]);
        assert_eq!(decode_registry_string(&bytes), value);
    }

    #[test]
    fn decode_registry_string_stops_at_nul() {
        let mut bytes = encode_registry_string(r"C:\Tools");
        bytes.extend_from_slice(&[0, 0, b'x', 0, 7]);
        assert_eq!(decode_registry_string(&bytes), r"C:\Tools");
        assert_eq!(decode_registry_string(&[]), "");
    }

    #[cfg(not(target_os = "windows"))]
    #[test]
    #[serial_test::serial]
    fn user_environment_uses_process_environment() {
        let store = UserEnvironment;
        store.set("INSTALLKIT_USER_ENV_TEST", "value").unwrap();
        assert_eq!(
            store.get("INSTALLKIT_USER_ENV_TEST").unwrap().as_deref(),
            Some("value")
        );
        std::env::remove_var("INSTALLKIT_USER_ENV_TEST");
        assert_eq!(store.get("INSTALLKIT_USER_ENV_TEST").unwrap(), None);
    }
}
