//! # Entry
//!
//! The exported symbol the game's GZCOM loader looks up, and the `cIGZCOMDirector` object behind it.
//!
//! The loader calls `GZDllGetGZCOMDirector` and then drives the returned object through its C++ virtual
//! function table, so [`HostDirector`] starts with a pointer to a table in `cIGZCOMDirector` slot order.
//! The game is a 32-bit MSVC executable, which calls those slots with `thiscall`.

use std::ffi::c_void;
use std::ptr;
use std::sync::atomic::{AtomicPtr, AtomicU32, Ordering};

use lazy_static::lazy_static;

use crate::director::Director;
use crate::patcher::byte::BytePatcher;
use crate::patcher::mem::PermissionWrapper;
use crate::version::HostVersionProbe;
use crate::{logger, module};

/// Interface ID of `cIGZUnknown`
pub const IID_UNKNOWN: u32 = 0x00000001;

/// Interface ID of `cIGZCOMDirector`
pub const IID_COM_DIRECTOR: u32 = 0xA21EE941;

/// The director type used inside the game
pub type PluginDirector = Director<HostVersionProbe, PermissionWrapper<BytePatcher>>;

/// Builds [`DirectorVTable`], its functions and [`VTABLE`] with the calling convention of the target:
/// `thiscall` on 32-bit x86 where the game runs, the C convention everywhere else.
macro_rules! director_vtable {
    (@abi $abi:literal; $($(#[$meta:meta])* fn $name:ident($this:ident $(, $arg:ident: $ty:ty)*) -> $ret:ty $body:block)*) => {
        /// `cIGZCOMDirector` virtual function table, in slot order
        #[repr(C)]
        pub struct DirectorVTable {
            $(
                $(#[$meta])*
                pub $name: unsafe extern $abi fn(*const HostDirector $(, $ty)*) -> $ret,
            )*
        }

        $(
            $(#[$meta])*
            ///
            /// # Safety
            ///
            /// `this` must point to a live [`HostDirector`]
            unsafe extern $abi fn $name($this: *const HostDirector $(, $arg: $ty)*) -> $ret $body
        )*

        /// Shared by every [`HostDirector`]
        static VTABLE: DirectorVTable = DirectorVTable { $($name,)* };
    };
    ($($(#[$meta:meta])* fn $name:ident($this:ident $(, $arg:ident: $ty:ty)*) -> $ret:ty $body:block)*) => {
        #[cfg(target_arch = "x86")]
        director_vtable!(@abi "thiscall"; $($(#[$meta])* fn $name($this $(, $arg: $ty)*) -> $ret $body)*);
        #[cfg(not(target_arch = "x86"))]
        director_vtable!(@abi "C"; $($(#[$meta])* fn $name($this $(, $arg: $ty)*) -> $ret $body)*);
    };
}

director_vtable! {
    /// `QueryInterface`: hands out this object for `cIGZUnknown` and `cIGZCOMDirector`
    fn query_interface(this, iid: u32, out: *mut *mut c_void) -> bool {
        if out.is_null() {
            return false;
        }
        match iid {
            IID_UNKNOWN | IID_COM_DIRECTOR => {
                (*this).add_ref();
                *out = this as *mut c_void;
                true
            }
            _ => {
                *out = ptr::null_mut();
                false
            }
        }
    }

    /// `AddRef`
    fn add_ref(this) -> u32 {
        (*this).add_ref()
    }

    /// `Release`. The director lives for the whole process, so nothing is freed
    fn release(this) -> u32 {
        (*this).remove_ref()
    }

    /// `InitializeCOM`: remembers the game's `cIGZCOM`, the library path is not needed
    fn initialize_com(this, com: *mut c_void, _library_path: *const c_void) -> bool {
        (*this).com.store(com, Ordering::SeqCst);
        true
    }

    /// `OnStart`: applies the patch, always reports success
    fn on_start(this, _com: *mut c_void) -> bool {
        (*this).director.on_start()
    }

    /// `EnumClassObjects`: this plugin registers no classes
    fn enum_class_objects(_this, _callback: *const c_void, _context: *mut c_void) -> () {}

    /// `GetClassObject`: this plugin registers no classes
    fn get_class_object(_this, _clsid: u32, _iid: u32, out: *mut *mut c_void) -> bool {
        if !out.is_null() {
            *out = ptr::null_mut();
        }
        false
    }

    /// `CanUnloadNow`: the module stays mapped for the rest of the session
    fn can_unload_now(_this) -> bool {
        false
    }

    /// `OnUnload`: the patch is left in place
    fn on_unload(_this) -> bool {
        true
    }

    /// `RefCount`
    fn ref_count(this) -> u32 {
        (*this).refs.load(Ordering::SeqCst)
    }

    /// `RemoveRef`
    fn remove_ref(this) -> u32 {
        (*this).remove_ref()
    }

    /// `FrameWork`: the framework is never looked up
    fn framework(_this) -> *mut c_void {
        ptr::null_mut()
    }

    /// `GZCOM`: the `cIGZCOM` passed to `InitializeCOM`
    fn gzcom(this) -> *mut c_void {
        (*this).com.load(Ordering::SeqCst)
    }

    /// `GetDirectorID`
    fn get_director_id(this) -> u32 {
        (*this).director.director_id()
    }

    /// `GetLibraryPath`: the path is not tracked
    fn get_library_path(_this, _path: *mut c_void) -> bool {
        false
    }

    /// `GetHeapAllocatedSize`
    fn get_heap_allocated_size(_this) -> u32 {
        0
    }
}

/// Director object as seen by the loader: the virtual table pointer followed by the plugin state
#[repr(C)]
pub struct HostDirector {
    /// Virtual function table, always [`VTABLE`]
    vtable: &'static DirectorVTable,
    /// GZCOM reference count
    refs: AtomicU32,
    /// The game's `cIGZCOM`, once initialized
    com: AtomicPtr<c_void>,
    /// Plugin state
    director: PluginDirector,
}
impl HostDirector {
    /// Wraps `director` for the loader
    pub fn new(director: PluginDirector) -> Self {
        Self {
            vtable: &VTABLE,
            refs: AtomicU32::new(0),
            com: AtomicPtr::new(ptr::null_mut()),
            director,
        }
    }

    /// Virtual function table of this director
    pub fn vtable(&self) -> &'static DirectorVTable {
        self.vtable
    }

    /// The wrapped director
    pub fn director(&self) -> &PluginDirector {
        &self.director
    }

    /// Increments the reference count, returning the new count
    fn add_ref(&self) -> u32 {
        self.refs.fetch_add(1, Ordering::SeqCst).wrapping_add(1)
    }

    /// Decrements the reference count without going below zero, returning the new count
    fn remove_ref(&self) -> u32 {
        let previous = self
            .refs
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| Some(n.saturating_sub(1)))
            .unwrap_or_else(|n| n);
        previous.saturating_sub(1)
    }
}

lazy_static! {
    /// The process-wide director, built on first request
    static ref DIRECTOR: HostDirector = HostDirector::new(Director::load(
        HostVersionProbe::new(),
        PermissionWrapper::new(BytePatcher::new()),
        module::current_module_path,
        logger::init,
    ));
}

/// Returns the plugin's director. Every call returns the same pointer.
#[allow(non_snake_case)]
#[no_mangle]
pub extern "C" fn GZDllGetGZCOMDirector() -> *mut HostDirector {
    &*DIRECTOR as *const HostDirector as *mut HostDirector
}
