use lineport_proto::session::receive_into;
use tracing::info;

use crate::cmd::{parse_timeout, ReceiveArgs};
use crate::exit::{transfer_error, transport_error, CliResult, SUCCESS};
use crate::output::{print_report, OutputFormat, Role};

pub fn run(args: ReceiveArgs, format: OutputFormat) -> CliResult<i32> {
    let serial = args.line.serial_config()?;
    let mut config = args.line.transfer_config()?;
    config.start_timeout = parse_timeout(&args.start_timeout)?;

    info!(port = %args.line.port, line = %serial, dest = ?args.dest, "waiting for sender");
    let link = args
        .line
        .port
        .open_receiver(&serial, config.start_timeout)
        .map_err(|err| transport_error("waiting for sender failed", err))?;

    let report = receive_into(&args.dest, link, &config, args.atomic)
        .map_err(|err| transfer_error("receive failed", err))?;

    print_report(Role::Receive, &report, &args.line.port, &serial, format);
    Ok(SUCCESS)
}
