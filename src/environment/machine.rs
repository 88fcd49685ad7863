//! Machine descriptors: OS family, CPU family, endianness, kernel tag.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MachineKind {
    Build,
    Host,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsFamily {
    Linux,
    Darwin,
    Windows,
    FreeBsd,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpuFamily {
    X86_64,
    Aarch64,
    Arm,
    X86,
    Riscv64,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endianness {
    Little,
    Big,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelTag {
    Linux,
    Xnu,
    Nt,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineInfo {
    pub os: OsFamily,
    pub cpu: CpuFamily,
    pub endian: Endianness,
    pub kernel: KernelTag,
}

impl MachineInfo {
    /// Describes the machine this process is currently running on,
    /// used as the default build machine for a native configuration.
    pub fn host_native() -> Self {
        let os = if cfg!(target_os = "linux") {
            OsFamily::Linux
        } else if cfg!(target_os = "macos") {
            OsFamily::Darwin
        } else if cfg!(target_os = "windows") {
            OsFamily::Windows
        } else if cfg!(target_os = "freebsd") {
            OsFamily::FreeBsd
        } else {
            OsFamily::Other
        };
        let cpu = if cfg!(target_arch = "x86_64") {
            CpuFamily::X86_64
        } else if cfg!(target_arch = "aarch64") {
            CpuFamily::Aarch64
        } else if cfg!(target_arch = "arm") {
            CpuFamily::Arm
        } else if cfg!(target_arch = "x86") {
            CpuFamily::X86
        } else if cfg!(target_arch = "riscv64") {
            CpuFamily::Riscv64
        } else {
            CpuFamily::Other
        };
        let kernel = match os {
            OsFamily::Linux => KernelTag::Linux,
            OsFamily::Darwin => KernelTag::Xnu,
            OsFamily::Windows => KernelTag::Nt,
            _ => KernelTag::Other,
        };
        Self { os, cpu, endian: Endianness::Little, kernel }
    }
}
