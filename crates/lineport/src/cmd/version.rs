use lineport_proto::{DEFAULT_MAX_LINES, DEFAULT_MAX_LINE_LEN, MAX_FILE_NAME_LEN};
use lineport_transport::{SerialConfig, DEFAULT_PORT};

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("lineport {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: lineport");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "target: {}",
        option_env!("LINEPORT_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!("default_port: {DEFAULT_PORT}");
    println!("default_line: {}", SerialConfig::default());
    println!(
        "limits: lines={DEFAULT_MAX_LINES}, line_bytes={DEFAULT_MAX_LINE_LEN}, name_bytes={MAX_FILE_NAME_LEN}"
    );
    println!("serial_devices: {}", cfg!(unix));

    Ok(SUCCESS)
}
