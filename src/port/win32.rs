//! kernel32 communications entry points, resolved once per process.
//!
//! The table is immutable after the first successful load and handed to
//! each device by reference.

use once_cell::sync::OnceCell;
use std::ffi::OsStr;
use std::io;
use std::iter::once;
use std::os::windows::ffi::OsStrExt;
use winapi::shared::minwindef::{BOOL, DWORD, FARPROC, HMODULE, LPDWORD};
use winapi::um::libloaderapi::{GetModuleHandleW, GetProcAddress};
use winapi::um::minwinbase::{LPOVERLAPPED, LPSECURITY_ATTRIBUTES};
use winapi::um::winbase::{LPCOMMTIMEOUTS, LPDCB};
use winapi::um::winnt::{HANDLE, LPCWSTR};

type CommStateFn = unsafe extern "system" fn(HANDLE, LPDCB) -> BOOL;
type CommTimeoutsFn = unsafe extern "system" fn(HANDLE, LPCOMMTIMEOUTS) -> BOOL;
type HandleDwordFn = unsafe extern "system" fn(HANDLE, DWORD) -> BOOL;
type SetupCommFn = unsafe extern "system" fn(HANDLE, DWORD, DWORD) -> BOOL;
type OverlappedResultFn = unsafe extern "system" fn(HANDLE, LPOVERLAPPED, LPDWORD, BOOL) -> BOOL;
type CreateEventFn = unsafe extern "system" fn(LPSECURITY_ATTRIBUTES, BOOL, BOOL, LPCWSTR) -> HANDLE;
type ResetEventFn = unsafe extern "system" fn(HANDLE) -> BOOL;
type ModemStatusFn = unsafe extern "system" fn(HANDLE, LPDWORD) -> BOOL;

/// Function pointers into kernel32.
#[derive(Debug)]
pub struct Kernel32 {
    pub get_comm_state: CommStateFn,
    pub set_comm_state: CommStateFn,
    pub set_comm_timeouts: CommTimeoutsFn,
    pub set_comm_mask: HandleDwordFn,
    pub setup_comm: SetupCommFn,
    pub get_overlapped_result: OverlappedResultFn,
    pub create_event: CreateEventFn,
    pub reset_event: ResetEventFn,
    pub purge_comm: HandleDwordFn,
    pub escape_comm_function: HandleDwordFn,
    pub get_comm_modem_status: ModemStatusFn,
}

static KERNEL32: OnceCell<Kernel32> = OnceCell::new();

/// The process-wide table, loading it on first use.
pub fn kernel32() -> io::Result<&'static Kernel32> {
    KERNEL32.get_or_try_init(Kernel32::load)
}

macro_rules! resolve {
    ($module:expr, $name:literal) => {{
        let proc = resolve_proc($module, concat!($name, "\0"))?;
        // SAFETY: the symbol is the documented kernel32 export of this name,
        // whose signature matches the target function pointer type.
        unsafe { std::mem::transmute::<FARPROC, _>(proc) }
    }};
}

impl Kernel32 {
    fn load() -> io::Result<Self> {
        let name: Vec<u16> = OsStr::new("kernel32.dll")
            .encode_wide()
            .chain(once(0))
            .collect();
        let module = unsafe { GetModuleHandleW(name.as_ptr()) };
        if module.is_null() {
            return Err(io::Error::last_os_error());
        }

        let table = Self {
            get_comm_state: resolve!(module, "GetCommState"),
            set_comm_state: resolve!(module, "SetCommState"),
            set_comm_timeouts: resolve!(module, "SetCommTimeouts"),
            set_comm_mask: resolve!(module, "SetCommMask"),
            setup_comm: resolve!(module, "SetupComm"),
            get_overlapped_result: resolve!(module, "GetOverlappedResult"),
            create_event: resolve!(module, "CreateEventW"),
            reset_event: resolve!(module, "ResetEvent"),
            purge_comm: resolve!(module, "PurgeComm"),
            escape_comm_function: resolve!(module, "EscapeCommFunction"),
            get_comm_modem_status: resolve!(module, "GetCommModemStatus"),
        };
        tracing::debug!("kernel32 communications table loaded");
        Ok(table)
    }
}

fn resolve_proc(module: HMODULE, name: &'static str) -> io::Result<FARPROC> {
    let proc = unsafe { GetProcAddress(module, name.as_ptr().cast()) };
    if proc.is_null() {
        let err = io::Error::last_os_error();
        return Err(io::Error::new(
            err.kind(),
            format!("{}: {}", name.trim_end_matches('\0'), err),
        ));
    }
    Ok(proc)
}
