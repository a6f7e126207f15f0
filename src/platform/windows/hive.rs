//! `HKEY_CURRENT_USER` access through the Win32 registry API.

use std::ffi::c_void;

use ::windows::core::PCWSTR;
use ::windows::Win32::Foundation::{ERROR_FILE_NOT_FOUND, WIN32_ERROR};
use ::windows::Win32::System::Registry::{
    RegDeleteKeyValueW, RegGetValueW, RegSetKeyValueW, HKEY_CURRENT_USER, REG_BINARY,
    REG_ROUTINE_FLAGS, REG_SZ, RRF_RT_REG_BINARY, RRF_RT_REG_SZ,
};

use super::RegistryHive;
use crate::AutoLaunchError;

/// The current user's hive. Stateless; every call goes straight to the registry.
#[derive(Debug, Clone, Copy, Default)]
pub struct CurrentUserHive;

fn wide(text: &str) -> Vec<u16> {
    text.encode_utf16().chain(std::iter::once(0)).collect()
}

fn check(status: WIN32_ERROR, key: &str, name: &str) -> Result<(), AutoLaunchError> {
    status.ok().map_err(|e| AutoLaunchError::Registry {
        key: key.to_string(),
        value: name.to_string(),
        message: e.message(),
    })
}

impl CurrentUserHive {
    /// Read a value's raw bytes, or `None` if it does not exist.
    fn read(
        &self,
        key: &str,
        name: &str,
        flags: REG_ROUTINE_FLAGS,
    ) -> Result<Option<Vec<u8>>, AutoLaunchError> {
        let key_w = wide(key);
        let name_w = wide(name);
        let mut size = 0u32;
        // SAFETY: both strings are NUL-terminated and outlive the call; a null data
        // pointer asks only for the required size.
        let status = unsafe {
            RegGetValueW(
                HKEY_CURRENT_USER,
                PCWSTR(key_w.as_ptr()),
                PCWSTR(name_w.as_ptr()),
                flags,
                None,
                None,
                Some(&mut size as *mut u32),
            )
        };
        if status == ERROR_FILE_NOT_FOUND {
            return Ok(None);
        }
        check(status, key, name)?;

        let mut data = vec![0u8; size as usize];
        // SAFETY: `data` holds `size` writable bytes, as reported by the sizing call.
        let status = unsafe {
            RegGetValueW(
                HKEY_CURRENT_USER,
                PCWSTR(key_w.as_ptr()),
                PCWSTR(name_w.as_ptr()),
                flags,
                None,
                Some(data.as_mut_ptr().cast::<c_void>()),
                Some(&mut size as *mut u32),
            )
        };
        if status == ERROR_FILE_NOT_FOUND {
            return Ok(None);
        }
        check(status, key, name)?;
        data.truncate(size as usize);
        Ok(Some(data))
    }

    fn write(&self, key: &str, name: &str, kind: u32, data: &[u8]) -> Result<(), AutoLaunchError> {
        let key_w = wide(key);
        let name_w = wide(name);
        // SAFETY: strings are NUL-terminated; `data` is valid for `data.len()` bytes.
        // RegSetKeyValueW creates the subkey when it is missing.
        let status = unsafe {
            RegSetKeyValueW(
                HKEY_CURRENT_USER,
                PCWSTR(key_w.as_ptr()),
                PCWSTR(name_w.as_ptr()),
                kind,
                Some(data.as_ptr().cast::<c_void>()),
                data.len() as u32,
            )
        };
        check(status, key, name)
    }
}

impl RegistryHive for CurrentUserHive {
    fn get_string(&self, key: &str, name: &str) -> Result<Option<String>, AutoLaunchError> {
        Ok(self.read(key, name, RRF_RT_REG_SZ)?.map(|bytes| {
            let units: Vec<u16> = bytes
                .chunks_exact(2)
                .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
                .take_while(|unit| *unit != 0)
                .collect();
            String::from_utf16_lossy(&units)
        }))
    }

    fn set_string(&self, key: &str, name: &str, value: &str) -> Result<(), AutoLaunchError> {
        let bytes: Vec<u8> = wide(value)
            .into_iter()
            .flat_map(u16::to_le_bytes)
            .collect();
        self.write(key, name, REG_SZ.0, &bytes)
    }

    fn get_binary(&self, key: &str, name: &str) -> Result<Option<Vec<u8>>, AutoLaunchError> {
        self.read(key, name, RRF_RT_REG_BINARY)
    }

    fn set_binary(&self, key: &str, name: &str, value: &[u8]) -> Result<(), AutoLaunchError> {
        self.write(key, name, REG_BINARY.0, value)
    }

    fn delete_value(&self, key: &str, name: &str) -> Result<(), AutoLaunchError> {
        let key_w = wide(key);
        let name_w = wide(name);
        // SAFETY: both strings are NUL-terminated and outlive the call.
        let status = unsafe {
            RegDeleteKeyValueW(
                HKEY_CURRENT_USER,
                PCWSTR(key_w.as_ptr()),
                PCWSTR(name_w.as_ptr()),
            )
        };
        check(status, key, name)
    }
}
