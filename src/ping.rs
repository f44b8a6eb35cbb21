use tokio::process::Command;

/// How the host OS expects `ping` to be invoked for a single echo request.
pub trait PingPlatform: Send + Sync {
    fn program(&self) -> &str {
        "ping"
    }

    fn args(&self, host: &str) -> Vec<String>;

    /// Hook for OS specific process setup.
    fn configure(&self, _command: &mut Command) {}

    fn command(&self, host: &str) -> Command {
        let mut command = Command::new(self.program());
        command.args(self.args(host));
        self.configure(&mut command);
        command
    }
}

/// `ping -n 1 -w 2000 <host>`, run without a console window.
pub struct WindowsPing;

impl PingPlatform for WindowsPing {
    fn args(&self, host: &str) -> Vec<String> {
        ["-n", "1", "-w", "2000", host]
            .into_iter()
            .map(String::from)
            .collect()
    }

    #[cfg(windows)]
    fn configure(&self, command: &mut Command) {
        const CREATE_NO_WINDOW: u32 = 0x0800_0000;
        command.creation_flags(CREATE_NO_WINDOW);
    }
}

/// `ping -c 1 -W 2 <host>`
pub struct UnixPing;

impl PingPlatform for UnixPing {
    fn args(&self, host: &str) -> Vec<String> {
        ["-c", "1", "-W", "2", host]
            .into_iter()
            .map(String::from)
            .collect()
    }
}

pub fn native() -> &'static dyn PingPlatform {
    #[cfg(windows)]
    {
        &WindowsPing
    }
    #[cfg(not(windows))]
    {
        &UnixPing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_arguments() {
        assert_eq!(WindowsPing.args("10.0.0.1"), ["-n", "1", "-w", "2000", "10.0.0.1"]);
        assert_eq!(UnixPing.args("10.0.0.1"), ["-c", "1", "-W", "2", "10.0.0.1"]);
        assert_eq!(native().program(), "ping");
    }
}
