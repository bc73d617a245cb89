pub mod bitflags;
pub mod errorfmt;
pub mod mmap;
pub mod oserror;
