//! Win32 plumbing
//!
//! Registry reads, the shared-memory endpoint record and synthesized key
//! input. Handles are wrapped so they are released on every path.
//! Other platforms get stubs that always fail.

/// One synthesized key transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub scan_code: u16,
    pub down: bool,
}

/// Decode a REG_SZ payload (UTF-16LE, maybe nul terminated)
pub fn decode_wide(bytes: &[u8]) -> String {
    let wide: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .take_while(|c| *c != 0)
        .collect();
    String::from_utf16_lossy(&wide)
}

#[cfg(windows)]
mod imp {
    use super::KeyEvent;
    use windows::core::{HSTRING, PCWSTR};
    use windows::Win32::Foundation::{CloseHandle, BOOL, ERROR_SUCCESS, HANDLE};
    use windows::Win32::System::Memory::{
        MapViewOfFile, OpenFileMappingW, UnmapViewOfFile, VirtualQuery, FILE_MAP_READ,
        MEMORY_BASIC_INFORMATION, MEMORY_MAPPED_VIEW_ADDRESS,
    };
    use windows::Win32::System::Registry::{RegGetValueW, HKEY_CURRENT_USER, RRF_RT_ANY};
    use windows::Win32::UI::Input::KeyboardAndMouse::{
        SendInput, INPUT, INPUT_0, INPUT_KEYBOARD, KEYBDINPUT, KEYBD_EVENT_FLAGS, KEYEVENTF_KEYUP,
        KEYEVENTF_SCANCODE, VIRTUAL_KEY,
    };

    struct MappingHandle(HANDLE);

    impl Drop for MappingHandle {
        fn drop(&mut self) {
            unsafe {
                let _ = CloseHandle(self.0);
            }
        }
    }

    struct MappedView(MEMORY_MAPPED_VIEW_ADDRESS);

    impl Drop for MappedView {
        fn drop(&mut self) {
            unsafe {
                let _ = UnmapViewOfFile(self.0);
            }
        }
    }

    pub fn read_registry_value(key: &str, value: &str) -> Result<Vec<u8>, String> {
        let key_w = HSTRING::from(key);
        let value_w = HSTRING::from(value);
        let mut size: u32 = 0;

        let status = unsafe {
            RegGetValueW(
                HKEY_CURRENT_USER,
                PCWSTR(key_w.as_ptr()),
                PCWSTR(value_w.as_ptr()),
                RRF_RT_ANY,
                None,
                None,
                Some(&mut size as *mut u32),
            )
        };
        if status != ERROR_SUCCESS {
            return Err(format!("RegGetValueW failed with error code 0x{:X}", status.0));
        }

        let mut buffer = vec![0u8; size as usize];
        let status = unsafe {
            RegGetValueW(
                HKEY_CURRENT_USER,
                PCWSTR(key_w.as_ptr()),
                PCWSTR(value_w.as_ptr()),
                RRF_RT_ANY,
                None,
                Some(buffer.as_mut_ptr().cast()),
                Some(&mut size as *mut u32),
            )
        };
        if status != ERROR_SUCCESS {
            return Err(format!("RegGetValueW failed with error code 0x{:X}", status.0));
        }

        buffer.truncate(size as usize);
        Ok(buffer)
    }

    pub fn read_shared_string(name: &str) -> Result<String, String> {
        let name_w = HSTRING::from(name);

        let handle = unsafe { OpenFileMappingW(FILE_MAP_READ.0, BOOL::from(false), PCWSTR(name_w.as_ptr())) }
            .map_err(|e| format!("OpenFileMapping({}) failed: {}", name, e))?;
        let handle = MappingHandle(handle);

        let view = unsafe { MapViewOfFile(handle.0, FILE_MAP_READ, 0, 0, 0) };
        if view.Value.is_null() {
            return Err(format!("MapViewOfFile({}) failed", name));
        }
        let view = MappedView(view);

        let mut info = MEMORY_BASIC_INFORMATION::default();
        let written = unsafe {
            VirtualQuery(
                Some(view.0.Value as *const _),
                &mut info,
                std::mem::size_of::<MEMORY_BASIC_INFORMATION>(),
            )
        };
        if written == 0 {
            return Err(format!("VirtualQuery({}) failed", name));
        }

        let bytes = unsafe { std::slice::from_raw_parts(view.0.Value as *const u8, info.RegionSize) };
        let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
        Ok(String::from_utf8_lossy(&bytes[..end]).into_owned())
    }

    pub fn send_keys(events: &[KeyEvent]) -> Result<(), String> {
        let inputs: Vec<INPUT> = events
            .iter()
            .map(|event| {
                let mut flags: KEYBD_EVENT_FLAGS = KEYEVENTF_SCANCODE;
                if !event.down {
                    flags |= KEYEVENTF_KEYUP;
                }
                INPUT {
                    r#type: INPUT_KEYBOARD,
                    Anonymous: INPUT_0 {
                        ki: KEYBDINPUT {
                            wVk: VIRTUAL_KEY(0),
                            wScan: event.scan_code,
                            dwFlags: flags,
                            time: 0,
                            dwExtraInfo: 0,
                        },
                    },
                }
            })
            .collect();

        let sent = unsafe { SendInput(&inputs, std::mem::size_of::<INPUT>() as i32) };
        if sent as usize != inputs.len() {
            return Err(format!("SendInput injected {} of {} events", sent, inputs.len()));
        }
        Ok(())
    }
}

#[cfg(not(windows))]
mod imp {
    use super::KeyEvent;

    const UNSUPPORTED: &str = "not supported on this platform";

    pub fn read_registry_value(_key: &str, _value: &str) -> Result<Vec<u8>, String> {
        Err(format!("registry access {}", UNSUPPORTED))
    }

    pub fn read_shared_string(_name: &str) -> Result<String, String> {
        Err(format!("shared memory {}", UNSUPPORTED))
    }

    pub fn send_keys(_events: &[KeyEvent]) -> Result<(), String> {
        Err(format!("synthesized input {}", UNSUPPORTED))
    }
}

pub use imp::{read_registry_value, read_shared_string, send_keys};
