pub const SOCKET_PATH: &str = "/dev/socket/g3dfreq.sock";
pub const CONFIG_DIR: &str = "/data/adb/.config/g3dfreq";
pub const STATE_FILE: &str = "/data/adb/.config/g3dfreq/current_clock";
