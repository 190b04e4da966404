//! Line-oriented scraping of `lsmod` and `modetest -p` output.

use std::sync::LazyLock;

use regex::Regex;

// Active mode rows in `modetest -p` are prefixed with '*':
//   * 2 1920x1080 60.00 1920 2008 2052 2200 1080 1084 1089 1125 148500 flags: ...
static ACTIVE_MODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\*\s*\d+\s+(\d+x\d+)").expect("static regex"));

/// True if `driver` occurs anywhere in the lsmod listing.
pub fn module_listed(lsmod_out: &str, driver: &str) -> bool {
    lsmod_out.contains(driver)
}

/// First whitespace-delimited token of the first line mentioning "connected".
pub fn connector_id(probe_out: &str) -> Option<String> {
    probe_out
        .lines()
        .find(|line| line.contains("connected"))
        .and_then(|line| line.split_whitespace().next())
        .map(str::to_string)
}

/// Resolution of the first active mode row, exactly as printed.
pub fn current_mode(probe_out: &str) -> Option<String> {
    probe_out
        .lines()
        .find_map(|line| ACTIVE_MODE_RE.captures(line))
        .map(|caps| caps[1].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROBE: &str = "\
Connectors:
id\tencoder\tstatus\t\tname\t\tsize (mm)\tmodes\tencoders
31\t30\tconnected\tHDMI-A-1\t530x300\t\t12\t30
  modes:
\tindex name refresh (Hz) hdisp hss hse htot vdisp vss vse vtot
  #0 1920x1080 60.00 1920 2008 2052 2200 1080 1084 1089 1125 148500 flags: phsync, pvsync; type: preferred, driver
  #1 1280x720 60.00 1280 1390 1430 1650 720 725 730 750 74250 flags: phsync, pvsync; type: driver
CRTCs:
id\tfb\tpos\tsize
32\t40\t(0,0)\t(1920x1080)
  * 0 1920x1080 60.00 1920 2008 2052 2200 1080 1084 1089 1125 148500 flags: phsync, pvsync; type: preferred, driver
";

    #[test]
    fn connector_from_first_connected_line() {
        assert_eq!(connector_id(PROBE).as_deref(), Some("31"));
    }

    #[test]
    fn connector_leading_whitespace() {
        assert_eq!(connector_id("   44  7  connected  HDMI-A-2").as_deref(), Some("44"));
    }

    #[test]
    fn connector_missing() {
        assert_eq!(connector_id("Connectors:\nid\tencoder\tstatus\n"), None);
        assert_eq!(connector_id(""), None);
    }

    #[test]
    fn disconnected_line_still_matches() {
        // Plain substring match, same as the output layout it was written against.
        assert_eq!(connector_id("35\t0\tdisconnected\tHDMI-A-1").as_deref(), Some("35"));
    }

    #[test]
    fn current_mode_from_starred_row() {
        assert_eq!(current_mode(PROBE).as_deref(), Some("1920x1080"));
    }

    #[test]
    fn current_mode_ignores_unstarred_rows() {
        let out = "  1  1920x1060 60.00\n  #0 800x600 60.00\n";
        assert_eq!(current_mode(out), None);
    }

    #[test]
    fn current_mode_takes_first_match() {
        let out = "* 2  1280x720 60.00\n* 3  800x600 60.00\n";
        assert_eq!(current_mode(out).as_deref(), Some("1280x720"));
    }

    #[test]
    fn lsmod_substring() {
        let lsmod = "\
Module                  Size  Used by
ms912x                 24576  1
drm_shmem_helper       24576  1 ms912x
";
        assert!(module_listed(lsmod, "ms912x"));
        assert!(!module_listed(lsmod, "udl"));
        assert!(!module_listed("", "ms912x"));
    }
}
