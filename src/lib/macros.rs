macro_rules! raise(
    ($message:expr) => (return Err(::Error::new($message)));
    ($($arg:tt)*) => (return Err(::Error::new(format!($($arg)*))));
);

macro_rules! some(
    ($option:expr) => (match $option {
        Some(value) => value,
        _ => raise!("encountered a logic error"),
    });
    ($option:expr, $($arg:tt)+) => (match $option {
        Some(value) => value,
        _ => raise!($($arg)*),
    });
);
