use anyhow::{Error, ensure};
use trace_format::{DeviceTable, ExecutionLog, LogLine};

/// Ticks spent fetching the ISR address from the vector table.
///
/// They are part of every trap cost handed to [`dispatch`].
pub const VECTOR_FETCH_TICKS: u64 = 1;

/// Enters the ISR of `interrupt` at `current_time`.
///
/// The returned fragment always holds two lines: the mode switch with the
/// context save, followed by the vector fetch that loads the ISR address
/// into the PC. Together they take exactly `trap_cost` ticks, the second
/// value of the returned tuple is the time after the ISR address was loaded.
///
/// # Errors
///
/// This function fails if `interrupt` lies outside the vector table or
/// `trap_cost` cannot cover the vector fetch. Both are configuration errors.
pub fn dispatch(
    current_time: u64,
    interrupt: usize,
    trap_cost: u64,
    devices: &DeviceTable,
) -> Result<(ExecutionLog, u64), Error> {
    ensure!(
        trap_cost >= VECTOR_FETCH_TICKS,
        "Trap cost of {trap_cost} ticks cannot cover the vector fetch"
    );
    let address = devices.vector(interrupt)?;

    let mut fragment = ExecutionLog::new();
    let mut time = current_time;

    let context_save = trap_cost - VECTOR_FETCH_TICKS;
    fragment.push(LogLine::new(
        time,
        context_save,
        "switch to kernel mode, context saved",
    ));
    time += context_save;

    fragment.push(LogLine::new(
        time,
        VECTOR_FETCH_TICKS,
        format!("find vector {interrupt}: load address {address} into the PC"),
    ));
    time += VECTOR_FETCH_TICKS;

    Ok((fragment, time))
}

#[cfg(test)]
mod tests {
    use anyhow::Error;
    use trace_format::{DeviceTable, LogLine};

    use super::dispatch;

    fn devices() -> DeviceTable {
        DeviceTable::new(
            vec!["0X01E3".into(), "0X029C".into(), "0X0695".into()],
            vec![110, 4, 7],
        )
    }

    #[test]
    fn dispatch_emits_two_step_fragment() -> Result<(), Error> {
        let (fragment, time) = dispatch(5, 1, 10, &devices())?;

        assert_eq!(time, 15);
        assert_eq!(
            fragment.lines(),
            [
                LogLine::new(5, 9, "switch to kernel mode, context saved"),
                LogLine::new(14, 1, "find vector 1: load address 0X029C into the PC"),
            ]
        );

        Ok(())
    }

    #[test]
    fn trap_cost_bounds_the_fragment() -> Result<(), Error> {
        for cost in [1, 2, 3, 10, 250] {
            let (fragment, time) = dispatch(100, 2, cost, &devices())?;
            assert_eq!(time, 100 + cost);
            assert_eq!(fragment.len(), 2);
            assert_eq!(fragment.lines()[1].end(), time);
        }

        Ok(())
    }

    #[test]
    fn fail_outside_vector_table() {
        dispatch(0, 3, 10, &devices()).unwrap_err();
        dispatch(0, 0, 0, &devices()).unwrap_err();
    }
}
