//! Receive loop shared by the downstream workers.

use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::Duration;

use dirigo_core::StopSignal;

/// How long a worker waits for input before checking its stop signal.
pub(crate) const POLL: Duration = Duration::from_millis(20);

/// Feeds every item of `inbox` to `handle` until the producer disconnects,
/// or until a stop is requested and the inbox is empty.
pub(crate) fn consume<T, F>(
    inbox: &Receiver<T>,
    signal: &StopSignal,
    mut handle: F,
) -> dirigo_core::Result<u64>
where
    F: FnMut(T) -> dirigo_core::Result<()>,
{
    let mut handled = 0;
    loop {
        match inbox.recv_timeout(POLL) {
            Ok(item) => {
                handle(item)?;
                handled += 1;
            }
            Err(RecvTimeoutError::Timeout) => {
                if signal.is_requested() {
                    return Ok(handled);
                }
            }
            Err(RecvTimeoutError::Disconnected) => return Ok(handled),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn test_consume_drains_before_disconnect() {
        let (tx, rx) = mpsc::channel();
        for i in 0..5 {
            tx.send(i).unwrap();
        }
        drop(tx);
        let mut seen = Vec::new();
        let n = consume(&rx, &StopSignal::new(), |i| {
            seen.push(i);
            Ok(())
        })
        .unwrap();
        assert_eq!(n, 5);
        assert_eq!(seen, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_consume_honours_stop_when_idle() {
        let (tx, rx) = mpsc::channel::<u8>();
        let signal = StopSignal::new();
        signal.request();
        assert_eq!(consume(&rx, &signal, |_| Ok(())).unwrap(), 0);
        drop(tx);
    }

    #[test]
    fn test_consume_propagates_error() {
        let (tx, rx) = mpsc::channel();
        tx.send(1).unwrap();
        let result = consume(&rx, &StopSignal::new(), |_| {
            Err(dirigo_core::Error::Engine("disk full".into()))
        });
        assert!(result.is_err());
    }
}
