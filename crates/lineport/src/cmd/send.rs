use lineport_proto::session::{load_for_send, send_loaded};
use tracing::info;

use crate::cmd::SendArgs;
use crate::exit::{transfer_error, transport_error, CliResult, SUCCESS};
use crate::output::{print_report, OutputFormat, Role};

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let serial = args.line.serial_config()?;
    let config = args.line.transfer_config()?;

    // Bound violations surface here, before the port is opened.
    let (meta, file) = load_for_send(&args.file, &config.limits, args.name.as_deref())
        .map_err(|err| transfer_error("send failed", err))?;

    let link = args
        .line
        .port
        .open_sender(&serial)
        .map_err(|err| transport_error("open failed", err))?;
    info!(port = %args.line.port, line = %serial, file = meta.file_name(), "link open");

    let report = send_loaded(&meta, &file, link, &config)
        .map_err(|err| transfer_error("send failed", err))?;

    print_report(Role::Send, &report, &args.line.port, &serial, format);
    Ok(SUCCESS)
}
