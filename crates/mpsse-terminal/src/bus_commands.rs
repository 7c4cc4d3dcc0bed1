//! Bus commands: read, readloop, write, scan.
//!
//! Every argument is parsed before the first transaction, so a malformed
//! command never touches the bus.

use mpsse_types::byte::{OutputMode, format_byte, format_bytes, parse_byte_arg, parse_count};
use mpsse_types::error::{Result, ShellError};

use crate::cancel::CancelToken;
use crate::interpreter::{Command, CommandOutput, CommandRegistry, Session, expect_args};
use crate::transport::{DEFAULT_SCAN_RANGE, ScanEvent, Transport};

/// Register the bus commands into a registry.
pub fn register_bus_commands(reg: &mut CommandRegistry) {
    reg.register(Box::new(ReadCmd));
    reg.register(Box::new(ReadLoopCmd));
    reg.register(Box::new(WriteCmd));
    reg.register(Box::new(ScanCmd));
}

/// One read, addressed to a register when `register` is set.
fn read_once<'t>(
    transport: &'t mut Transport,
    device: u8,
    count: usize,
    register: Option<u8>,
    cancel: &CancelToken,
) -> Result<&'t [u8]> {
    match register {
        Some(register) => transport.read_register(device, register, count, cancel),
        None => transport.read(device, count, cancel),
    }
}

fn optional_register(args: &[&str], at: usize) -> Result<Option<u8>> {
    args.get(at)
        .map(|token| parse_byte_arg("register address", token))
        .transpose()
}

// ---------------------------------------------------------------------------
// read
// ---------------------------------------------------------------------------

struct ReadCmd;
impl Command for ReadCmd {
    fn name(&self) -> &str {
        "read"
    }
    fn aliases(&self) -> &[&str] {
        &["r"]
    }
    fn description(&self) -> &str {
        "Reads bytes from a device, optionally starting at a register"
    }
    fn usage(&self) -> &str {
        "read <dev addr> <num bytes> [reg addr]"
    }
    fn execute(
        &self,
        args: &[&str],
        session: &mut Session,
        cancel: &CancelToken,
    ) -> Result<CommandOutput> {
        expect_args(self, args, 2, Some(3))?;
        let device = parse_byte_arg("device address", args[0])?;
        let count = parse_count("number of bytes to read", args[1])? as usize;
        let register = optional_register(args, 2)?;

        let mode = session.output_mode;
        let bytes = read_once(&mut session.transport, device, count, register, cancel)?;
        let line = match register {
            Some(reg) => format!("Reg {}: {}", format_byte(reg, mode), format_bytes(bytes, mode)),
            None => format!("Read values: {}", format_bytes(bytes, mode)),
        };
        session.console.write_line(&line)?;
        Ok(CommandOutput::Done)
    }
}

// ---------------------------------------------------------------------------
// readloop
// ---------------------------------------------------------------------------

struct ReadLoopCmd;
impl Command for ReadLoopCmd {
    fn name(&self) -> &str {
        "readloop"
    }
    fn aliases(&self) -> &[&str] {
        &["rl"]
    }
    fn description(&self) -> &str {
        "Repeats a read a number of times, Ctrl-C stops early"
    }
    fn usage(&self) -> &str {
        "readloop <dev addr> <num bytes> <num loops> [reg addr]"
    }
    fn execute(
        &self,
        args: &[&str],
        session: &mut Session,
        cancel: &CancelToken,
    ) -> Result<CommandOutput> {
        expect_args(self, args, 3, Some(4))?;
        let device = parse_byte_arg("device address", args[0])?;
        let count = parse_count("number of bytes to read", args[1])? as usize;
        let loops = parse_count("number of loops", args[2])?;
        let register = optional_register(args, 3)?;

        let mode = session.output_mode;
        for i in 0..loops {
            cancel.check()?;
            let bytes = read_once(&mut session.transport, device, count, register, cancel)?;
            let line = format!("Loop {i}: {}", format_bytes(bytes, mode));
            session.console.write_line(&line)?;
        }
        Ok(CommandOutput::Done)
    }
}

// ---------------------------------------------------------------------------
// write
// ---------------------------------------------------------------------------

struct WriteCmd;
impl Command for WriteCmd {
    fn name(&self) -> &str {
        "write"
    }
    fn aliases(&self) -> &[&str] {
        &["w"]
    }
    fn description(&self) -> &str {
        "Writes bytes to a device"
    }
    fn usage(&self) -> &str {
        "write <dev addr> <byte> [byte...]"
    }
    fn execute(
        &self,
        args: &[&str],
        session: &mut Session,
        cancel: &CancelToken,
    ) -> Result<CommandOutput> {
        expect_args(self, args, 2, None)?;
        let device = parse_byte_arg("device address", args[0])?;
        let data = args[1..]
            .iter()
            .map(|token| parse_byte_arg("data byte", token))
            .collect::<Result<Vec<u8>>>()?;

        let sent = session.transport.write(device, &data, cancel)?;
        if sent != data.len() {
            log::warn!("Driver reported {sent} of {} bytes transferred", data.len());
        }
        let line = format!(
            "Successfully wrote {} bytes to device address {}",
            data.len(),
            format_byte(device, session.output_mode)
        );
        session.console.write_line(&line)?;
        Ok(CommandOutput::Done)
    }
}

// ---------------------------------------------------------------------------
// scan
// ---------------------------------------------------------------------------

struct ScanCmd;
impl Command for ScanCmd {
    fn name(&self) -> &str {
        "scan"
    }
    fn aliases(&self) -> &[&str] {
        &["s"]
    }
    fn description(&self) -> &str {
        "Probes a range of device addresses (default: 0 to 128)"
    }
    fn usage(&self) -> &str {
        "scan [start addr] [end addr]"
    }
    fn execute(
        &self,
        args: &[&str],
        session: &mut Session,
        cancel: &CancelToken,
    ) -> Result<CommandOutput> {
        expect_args(self, args, 0, Some(2))?;
        let start = match args.first() {
            Some(token) => parse_byte_arg("start address", token)?,
            None => DEFAULT_SCAN_RANGE.start,
        };
        let end = match args.get(1) {
            Some(token) => parse_byte_arg("end address", token)?,
            None => DEFAULT_SCAN_RANGE.end,
        };

        let mode: OutputMode = session.output_mode;
        let console = &mut session.console;
        let found = session.transport.scan(start..end, cancel, |event| match event {
            ScanEvent::Found(device) => {
                console.write_line(&format!("Found device: {}", format_byte(device, mode)))
            },
            ScanEvent::Error(device, status) => console.write_error(&format!(
                "{} at device address {}",
                ShellError::Transport(status),
                format_byte(device, mode)
            )),
        })?;
        session
            .console
            .write_line(&format!("Scan complete: {} device(s) found", found.len()))?;
        Ok(CommandOutput::Done)
    }
}

#[cfg(test)]
mod tests {
    use mpsse_platform::{BusOp, SimulatedBus};
    use mpsse_types::backend::{ChannelConfig, I2cChannel, Status, Transfer, TransferOptions};

    use crate::ShellState;
    use crate::testing::{bus_with, shell, shell_over};

    // -- read --------------------------------------------------------------

    #[test]
    fn read_without_register() {
        let bus = bus_with(0x50, &[10, 20, 30]);
        let (mut sh, out) = shell(&bus, "");
        sh.execute_line("read 0x50 3").unwrap();
        assert_eq!(out.contents(), "Read values: 10 20 30\n");
        assert_eq!(
            bus.transactions(),
            vec![BusOp::Read {
                device: 0x50,
                len: 3,
                options: TransferOptions::READ | TransferOptions::NO_ADDRESS,
            }]
        );
    }

    #[test]
    fn read_from_register_in_hex() {
        let mut regs = vec![0u8; 0x12];
        regs.extend_from_slice(&[0xab, 0x0c]);
        let bus = bus_with(0x50, &regs);
        let (mut sh, out) = shell(&bus, "");
        sh.execute_line("output hex").unwrap();
        sh.execute_line("r 0x50 2 0x12").unwrap();
        assert_eq!(out.contents(), "Reg 12: ab c\n");
        assert_eq!(
            bus.transactions(),
            vec![BusOp::ReadRegister {
                device: 0x50,
                register: 0x12,
                len: 2,
                write_options: TransferOptions::WRITE,
                read_options: TransferOptions::READ,
            }]
        );
    }

    #[test]
    fn read_parse_failure_skips_bus() {
        let bus = bus_with(0x50, &[]);
        let (mut sh, out) = shell(&bus, "");
        sh.execute_line("read 0x5G 2").unwrap();
        sh.execute_line("read 0x50 two").unwrap();
        sh.execute_line("read 0x50 2 0b111111111").unwrap();
        let text = out.contents();
        assert!(text.contains("could not parse device address \"0x5G\""));
        assert!(text.contains("could not parse number of bytes to read \"two\""));
        assert!(text.contains("could not parse register address \"0b111111111\""));
        assert!(bus.transactions().is_empty());
    }

    #[test]
    fn read_argument_count() {
        let bus = bus_with(0x50, &[]);
        let (mut sh, out) = shell(&bus, "");
        sh.execute_line("read 0x50").unwrap();
        sh.execute_line("read 0x50 1 2 3").unwrap();
        assert_eq!(
            out.contents()
                .matches("invalid number of arguments for read")
                .count(),
            2
        );
        assert!(bus.transactions().is_empty());
    }

    #[test]
    fn read_larger_than_buffer_rejected() {
        let bus = bus_with(0x50, &[]);
        let (mut sh, out) = shell(&bus, "");
        sh.execute_line("read 0x50 257").unwrap();
        assert!(out.contents().contains("exceeds the 256-byte buffer"));
        assert!(bus.transactions().is_empty());
    }

    #[test]
    fn read_missing_device_reports_status() {
        let bus = SimulatedBus::new();
        let (mut sh, out) = shell(&bus, "");
        assert_eq!(sh.execute_line("read 0x50 1").unwrap(), ShellState::Prompting);
        assert_eq!(out.contents(), "FTDI error: DeviceNotFound\n");
    }

    // -- readloop ----------------------------------------------------------

    #[test]
    fn readloop_issues_exactly_n_transactions() {
        let bus = bus_with(0x50, &[1, 2, 3, 4, 5, 6]);
        let (mut sh, out) = shell(&bus, "");
        sh.execute_line("readloop 0x50 2 3").unwrap();
        assert_eq!(bus.transactions().len(), 3);
        // The register pointer keeps advancing between plain reads.
        assert_eq!(out.contents(), "Loop 0: 1 2\nLoop 1: 3 4\nLoop 2: 5 6\n");
    }

    #[test]
    fn readloop_from_register_restarts_each_time() {
        let bus = bus_with(0x50, &[0, 7, 8]);
        let (mut sh, out) = shell(&bus, "");
        sh.execute_line("rl 0x50 2 2 1").unwrap();
        assert_eq!(out.contents(), "Loop 0: 7 8\nLoop 1: 7 8\n");
        assert!(bus
            .transactions()
            .iter()
            .all(|op| matches!(op, BusOp::ReadRegister { register: 1, .. })));
    }

    #[test]
    fn readloop_zero_loops_does_nothing() {
        let bus = bus_with(0x50, &[]);
        let (mut sh, out) = shell(&bus, "");
        sh.execute_line("readloop 0x50 1 0").unwrap();
        assert!(bus.transactions().is_empty());
        assert_eq!(out.contents(), "");
    }

    #[test]
    fn readloop_stops_on_transport_error() {
        let bus = bus_with(0x50, &[]);
        bus.set_fault(0x50, Some(Status::IoError));
        let (mut sh, out) = shell(&bus, "");
        sh.execute_line("readloop 0x50 1 5").unwrap();
        assert_eq!(bus.transactions().len(), 1);
        assert_eq!(out.contents(), "FTDI error: IoError\n");
    }

    #[test]
    fn readloop_rejects_bad_loop_count() {
        let bus = bus_with(0x50, &[]);
        let (mut sh, out) = shell(&bus, "");
        sh.execute_line("readloop 0x50 1 -3").unwrap();
        assert!(out.contents().contains("could not parse number of loops \"-3\""));
        assert!(bus.transactions().is_empty());
    }

    // -- write -------------------------------------------------------------

    #[test]
    fn write_sends_bytes_in_order() {
        let bus = bus_with(0x50, &[]);
        let (mut sh, out) = shell(&bus, "");
        sh.execute_line("w 0x50 0x10 0b101 255").unwrap();
        assert_eq!(
            out.contents(),
            "Successfully wrote 3 bytes to device address 80\n"
        );
        let regs = bus.registers(0x50).unwrap();
        assert_eq!(regs[0x10], 5);
        assert_eq!(regs[0x11], 255);
    }

    #[test]
    fn write_reports_requested_byte_count() {
        struct ShortWrite;
        impl I2cChannel for ShortWrite {
            fn initialize(&mut self, _: &ChannelConfig) -> Status {
                Status::Ok
            }
            fn read(&mut self, _: u8, buf: &mut [u8], _: TransferOptions) -> Transfer {
                Transfer::ok(buf.len())
            }
            fn write(&mut self, _: u8, _: &[u8], _: TransferOptions) -> Transfer {
                Transfer::ok(1)
            }
            fn read_register(
                &mut self,
                _: u8,
                _: u8,
                buf: &mut [u8],
                _: TransferOptions,
                _: TransferOptions,
            ) -> Transfer {
                Transfer::ok(buf.len())
            }
            fn close(&mut self) {}
        }

        let (mut sh, out) = shell_over(Box::new(ShortWrite), "");
        sh.execute_line("write 0x50 1 2 3").unwrap();
        assert_eq!(
            out.contents(),
            "Successfully wrote 3 bytes to device address 80\n"
        );
    }

    #[test]
    fn write_needs_data() {
        let bus = bus_with(0x50, &[]);
        let (mut sh, out) = shell(&bus, "");
        sh.execute_line("write 0x50").unwrap();
        assert!(out.contents().contains("invalid number of arguments for write"));
        assert!(bus.transactions().is_empty());
    }

    #[test]
    fn write_bad_data_byte_sends_nothing() {
        let bus = bus_with(0x50, &[]);
        let (mut sh, out) = shell(&bus, "");
        sh.execute_line("write 0x50 1 2 256").unwrap();
        assert!(out.contents().contains("could not parse data byte \"256\""));
        assert!(bus.transactions().is_empty());
    }

    #[test]
    fn write_larger_than_buffer_rejected() {
        let bus = bus_with(0x50, &[]);
        let (mut sh, out) = shell(&bus, "");
        let line = format!("write 0x50{}", " 1".repeat(257));
        sh.execute_line(&line).unwrap();
        assert!(out.contents().contains("transfer of 257 bytes"));
        assert!(bus.transactions().is_empty());
    }

    // -- scan --------------------------------------------------------------

    #[test]
    fn scan_finds_single_device() {
        let bus = bus_with(0x23, &[]);
        let (mut sh, out) = shell(&bus, "");
        sh.execute_line("scan").unwrap();
        assert_eq!(
            out.contents(),
            "Found device: 35\nScan complete: 1 device(s) found\n"
        );
        let ops = bus.transactions();
        assert_eq!(ops.len(), 128);
        // Every probe is a zero-length read of register 0 with full framing.
        assert!(ops.iter().all(|op| matches!(
            op,
            BusOp::ReadRegister {
                register: 0,
                len: 0,
                write_options: TransferOptions::WRITE,
                read_options: TransferOptions::READ,
                ..
            }
        )));
    }

    #[test]
    fn scan_custom_range() {
        let bus = bus_with(0x23, &[]);
        bus.add_device(0x40, &[]);
        let (mut sh, out) = shell(&bus, "");
        sh.execute_line("output hex").unwrap();
        sh.execute_line("s 0x30 0x50").unwrap();
        assert_eq!(bus.transactions().len(), 0x20);
        assert_eq!(
            out.contents(),
            "Found device: 40\nScan complete: 1 device(s) found\n"
        );
    }

    #[test]
    fn scan_reports_faults_and_continues() {
        let bus = bus_with(0x10, &[]);
        bus.add_device(0x11, &[]);
        bus.set_fault(0x10, Some(Status::IoError));
        let (mut sh, out) = shell(&bus, "");
        sh.execute_line("scan 0x10 0x12").unwrap();
        assert_eq!(
            out.contents(),
            "FTDI error: IoError at device address 16\nFound device: 17\nScan complete: 1 device(s) found\n"
        );
    }

    #[test]
    fn scan_empty_range() {
        let bus = bus_with(0x23, &[]);
        let (mut sh, out) = shell(&bus, "");
        sh.execute_line("scan 0x40 0x40").unwrap();
        assert!(bus.transactions().is_empty());
        assert_eq!(out.contents(), "Scan complete: 0 device(s) found\n");
    }

    #[test]
    fn scan_argument_count() {
        let bus = SimulatedBus::new();
        let (mut sh, out) = shell(&bus, "");
        sh.execute_line("scan 1 2 3").unwrap();
        assert!(out.contents().contains("invalid number of arguments for scan"));
    }
}
