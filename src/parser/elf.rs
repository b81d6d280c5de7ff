// src/parser/elf.rs

//! ELF hardening classification and exported-symbol filtering

use crate::db::models::{Fortify, HardeningFlags, Nx, Pie, Relro, StackProtector};
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

static GNU_STACK_RWE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"GNU_STACK.*RWE").expect("valid GNU_STACK regex"));
static TYPE_EXEC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Type:\s+EXEC").expect("valid ELF type regex"));
static TYPE_DYN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Type:\s+DYN").expect("valid ELF type regex"));
static SYMBOL_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_]{2}").expect("valid symbol regex"));

/// Common C runtime and libc symbols that say nothing about what a binary does
const EXCLUDED_SYMBOLS: &[&str] = &[
    "abort", "__assert_fail", "bindtextdomain", "__bss_start", "calloc", "chmod", "close",
    "close_stdout", "__data_start", "dcgettext", "dirname", "_edata", "_end", "error", "_exit",
    "exit", "fclose", "fdopen", "ferror", "fgets", "_fini", "fnmatch", "fopen", "fork", "fprintf",
    "__fprintf_chk", "fread", "free", "fscanf", "fwrite", "getenv", "getgrgid", "getgrnam",
    "getopt", "getopt_long", "getpwnam", "getpwuid", "gettimeofday", "__gmon_start__", "_init",
    "ioctl", "_IO_stdin_used", "isatty", "iswalnum", "iswprint", "iswspace",
    "_Jv_RegisterClasses", "kill", "__libc_csu_fini", "__libc_csu_init", "__libc_start_main",
    "localtime", "malloc", "memchr", "memcpy", "__memcpy_chk", "memmove", "mempcpy",
    "__mempcpy_chk", "memset", "mkstemp", "mktime", "opendir", "optarg", "pclose", "pipe",
    "popen", "__printf_chk", "printf", "__progname", "__progname_full", "program_invocation_name",
    "program_invocation_short_name", "program_name", "read", "readdir", "readlink", "realloc",
    "rename", "setenv", "setlocale", "sigaction", "sigaddset", "sigemptyset", "sigismember",
    "signal", "sigprocmask", "__stack_chk_fail", "stderr", "stdout", "stpcpy", "strcasecmp",
    "strchr", "strcmp", "strcpy", "strerror", "strftime", "strlen", "strncasecmp", "strnlen",
    "strrchr", "strstr", "strtol", "textdomain", "time", "umask", "unlink", "Version",
    "version_etc_copyright", "waitpid", "write", "__xstat",
];

static EXCLUDED: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| EXCLUDED_SYMBOLS.iter().copied().collect());

/// Classify hardening from the four `readelf` dumps of one file:
/// program headers (`-l`), dynamic section (`-d`), symbols (`-s`) and
/// file header (`-h`)
pub fn classify_elf(program_headers: &str, dynamic: &str, symbols: &str, file_header: &str) -> HardeningFlags {
    let relro = if program_headers.contains("GNU_RELRO") {
        if dynamic.contains("BIND_NOW") {
            Relro::Full
        } else {
            Relro::Partial
        }
    } else {
        Relro::None
    };

    let ssp = if symbols.contains("__stack_chk_fail") {
        StackProtector::Found
    } else {
        StackProtector::NotFound
    };

    let nx = if GNU_STACK_RWE.is_match(program_headers) {
        Nx::Disabled
    } else {
        Nx::Enabled
    };

    let pie = if TYPE_EXEC.is_match(file_header) {
        Pie::None
    } else if TYPE_DYN.is_match(file_header) {
        if dynamic.contains("(DEBUG)") {
            Pie::Enabled
        } else {
            Pie::Dso
        }
    } else {
        Pie::None
    };

    let fortify = if symbols.contains("_chk@GLIBC") {
        Fortify::Found
    } else {
        Fortify::NotFound
    };

    HardeningFlags { relro, ssp, pie, fortify, nx }
}

/// Whether `name` is dropped from a file's exported symbols
pub fn is_excluded_symbol(name: &str) -> bool {
    !SYMBOL_NAME.is_match(name) || EXCLUDED.contains(name) || name.starts_with("__cxa")
}

/// Keep the symbols worth indexing
pub fn filter_symbols<'a, I>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    names
        .into_iter()
        .filter(|n| !is_excluded_symbol(n))
        .map(str::to_string)
        .collect()
}

/// Parse `nm -D -g` output into the filtered symbol list.
///
/// The name is the last field of each line; a symbol version suffix
/// (`printf@GLIBC_2.2.5`) is removed first.
pub fn parse_nm_symbols(output: &str) -> Vec<String> {
    let names = output.lines().filter_map(|line| {
        let name = line.split_whitespace().last()?;
        Some(name.split('@').next().unwrap_or(name))
    });
    filter_symbols(names)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PIE_HEADERS: &str = "\
Program Headers:
  Type           Offset   VirtAddr           PhysAddr           FileSiz  MemSiz   Flg Align
  GNU_STACK      0x000000 0x0000000000000000 0x0000000000000000 0x000000 0x000000 RW  0x10
  GNU_RELRO      0x02db30 0x000000000002eb30 0x000000000002eb30 0x0014d0 0x0014d0 R   0x1
";

    #[test]
    fn test_hardened_pie() {
        let dynamic = " 0x0000000000000015 (DEBUG)              0x0\n 0x000000000000001e (FLAGS)              BIND_NOW\n";
        let symbols = "    12: 0000000000000000     0 FUNC    GLOBAL DEFAULT  UND __stack_chk_fail@GLIBC_2.4 (3)\n    13: 0000000000000000     0 FUNC    GLOBAL DEFAULT  UND __printf_chk@GLIBC_2.3.4 (4)\n";
        let header = "  Type:                              DYN (Shared object file)\n";

        let flags = classify_elf(PIE_HEADERS, dynamic, symbols, header);
        assert_eq!(flags.relro, Relro::Full);
        assert_eq!(flags.ssp, StackProtector::Found);
        assert_eq!(flags.pie, Pie::Enabled);
        assert_eq!(flags.fortify, Fortify::Found);
        assert_eq!(flags.nx, Nx::Enabled);
    }

    #[test]
    fn test_legacy_executable() {
        let headers = "  GNU_STACK      0x000000 0x00000000 0x00000000 0x00000 0x00000 RWE 0x10\n";
        let header = "  Type:                              EXEC (Executable file)\n";

        let flags = classify_elf(headers, "", "", header);
        assert_eq!(flags.relro, Relro::None);
        assert_eq!(flags.ssp, StackProtector::NotFound);
        assert_eq!(flags.pie, Pie::None);
        assert_eq!(flags.fortify, Fortify::NotFound);
        assert_eq!(flags.nx, Nx::Disabled);
    }

    #[test]
    fn test_partial_relro_dso() {
        let header = "  Type:                              DYN (Shared object file)\n";
        let flags = classify_elf(PIE_HEADERS, " 0x1 (NEEDED) Shared library: [libc.so.6]\n", "", header);
        assert_eq!(flags.relro, Relro::Partial);
        assert_eq!(flags.pie, Pie::Dso);
    }

    #[test]
    fn test_symbol_filter() {
        let kept = filter_symbols(["printf", "__cxa_throw", "my_custom_func"]);
        assert_eq!(kept, vec!["my_custom_func"]);
    }

    #[test]
    fn test_symbol_prefix_rule() {
        assert!(is_excluded_symbol("_1abc"));
        assert!(is_excluded_symbol("a"));
        assert!(is_excluded_symbol("9lives"));
        assert!(!is_excluded_symbol("_ZN3foo3barEv"));
        assert!(is_excluded_symbol("__cxa_finalize"));
        assert!(is_excluded_symbol("malloc"));
    }

    #[test]
    fn test_parse_nm_output() {
        let output = "\
                 U printf@GLIBC_2.2.5
                 w __cxa_finalize@GLIBC_2.2.5
                 U __stack_chk_fail
0000000000004010 T my_custom_func
0000000000004060 B rl_readline_name
";
        assert_eq!(parse_nm_symbols(output), vec!["my_custom_func", "rl_readline_name"]);
    }
}
