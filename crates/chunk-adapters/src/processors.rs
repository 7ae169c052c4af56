use std::marker::PhantomData;

use chunk_core::{BatchError, ItemProcessor};

/// Devuelve cada item tal cual.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThroughProcessor;

impl<T: Clone> ItemProcessor<T, T> for PassThroughProcessor {
    fn process(&self, item: &T) -> Result<Option<T>, BatchError> {
        Ok(Some(item.clone()))
    }
}

/// Procesador a partir de una closure. `Ok(None)` filtra el item.
pub struct FnProcessor<I, O, F> {
    f: F,
    _types: PhantomData<fn(&I) -> O>,
}

impl<I, O, F> ItemProcessor<I, O> for FnProcessor<I, O, F>
    where F: Fn(&I) -> Result<Option<O>, BatchError> + Send + Sync
{
    fn process(&self, item: &I) -> Result<Option<O>, BatchError> {
        (self.f)(item)
    }
}

pub fn processor_fn<I, O, F>(f: F) -> FnProcessor<I, O, F>
    where F: Fn(&I) -> Result<Option<O>, BatchError> + Send + Sync
{
    FnProcessor { f,
                  _types: PhantomData }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closure_processor_can_filter_and_fail() {
        let p = processor_fn(|n: &u32| match *n {
                    0 => Ok(None),
                    3 => Err(BatchError::Process(format!("Unable to process item {n}"))),
                    n => Ok(Some(n * 10)),
                });
        assert_eq!(p.process(&0), Ok(None));
        assert_eq!(p.process(&2), Ok(Some(20)));
        assert!(matches!(p.process(&3), Err(BatchError::Process(_))));
    }

    #[test]
    fn pass_through_clones() {
        assert_eq!(PassThroughProcessor.process(&"x".to_string()), Ok(Some("x".to_string())));
    }
}
