// Contract violations: bugs in this crate or in a caller, never bad input from a peer.

#[macro_export]
macro_rules! internal_error_message {
    () => {
        format!("Internal error at {}:{}.", file!(), line!())
    };
    ($($arg:tt)+) => {
        format!("Internal error at {}:{}: {}.", file!(), line!(), format!($($arg)*))
    };
}

#[macro_export]
macro_rules! internal_error {
    ($($arg:tt)*) => {
        panic!("{}", $crate::internal_error_message!($($arg)*))
    };
}
