use std::future::Future;

/// Fetches items for `seeds` in fixed-size batches until `target` items are collected
///
/// Batches are issued in seed order and results are appended in the order
/// they arrive, so the output order is stable for identical inputs. Stops early
/// once the target is reached; stops when the seeds are exhausted otherwise.
/// The result is truncated to `target`. The first error ends the loop and is returned.
pub async fn accumulate_batches<T, E, F, Fut>(
    seeds: &[String],
    batch_size: usize,
    target: usize,
    mut fetch: F,
) -> Result<Vec<T>, E>
where
    F: FnMut(Vec<String>) -> Fut,
    Fut: Future<Output = Result<Vec<T>, E>>,
{
    let mut collected = Vec::new();

    if target == 0 || seeds.is_empty() {
        return Ok(collected);
    }

    for (batch_number, batch) in seeds.chunks(batch_size.max(1)).enumerate() {
        let items = fetch(batch.to_vec()).await?;

        tracing::debug!(
            batch = batch_number,
            seeds = batch.len(),
            fetched = items.len(),
            "Batch fetched"
        );

        collected.extend(items);

        if collected.len() >= target {
            break;
        }
    }

    collected.truncate(target);
    Ok(collected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn seeds(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("s{}", i)).collect()
    }

    #[tokio::test]
    async fn test_stops_once_target_reached() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let recorded = calls.clone();

        let result = accumulate_batches(&seeds(12), 5, 8, move |batch| {
            recorded.lock().unwrap().push(batch.clone());
            async move {
                Ok::<_, ()>(
                    batch
                        .iter()
                        .flat_map(|s| [format!("{}-a", s), format!("{}-b", s)])
                        .collect::<Vec<_>>(),
                )
            }
        })
        .await
        .unwrap();

        assert_eq!(result.len(), 8);
        assert_eq!(result[0], "s0-a");
        // first batch already yields 10 items
        assert_eq!(calls.lock().unwrap().len(), 1);
        assert_eq!(calls.lock().unwrap()[0].len(), 5);
    }

    #[tokio::test]
    async fn test_stops_when_seeds_exhausted() {
        let calls = Arc::new(Mutex::new(0usize));
        let counter = calls.clone();

        let result = accumulate_batches(&seeds(7), 5, 100, move |batch| {
            *counter.lock().unwrap() += 1;
            async move { Ok::<_, ()>(batch) }
        })
        .await
        .unwrap();

        assert_eq!(*calls.lock().unwrap(), 2);
        assert_eq!(result, seeds(7));
    }

    #[tokio::test]
    async fn test_empty_batches_continue() {
        let result = accumulate_batches(&seeds(10), 5, 3, |batch| async move {
            if batch[0] == "s0" {
                Ok::<_, ()>(Vec::new())
            } else {
                Ok(batch)
            }
        })
        .await
        .unwrap();

        assert_eq!(result, vec!["s5", "s6", "s7"]);
    }

    #[tokio::test]
    async fn test_no_seeds_or_zero_target() {
        let none = accumulate_batches(&[], 5, 10, |batch| async move { Ok::<_, ()>(batch) })
            .await
            .unwrap();
        assert!(none.is_empty());

        let zero = accumulate_batches(&seeds(3), 5, 0, |batch| async move { Ok::<_, ()>(batch) })
            .await
            .unwrap();
        assert!(zero.is_empty());
    }

    #[tokio::test]
    async fn test_error_stops_accumulation() {
        let calls = Arc::new(Mutex::new(0usize));
        let counter = calls.clone();

        let result = accumulate_batches(&seeds(15), 5, 100, move |batch| {
            *counter.lock().unwrap() += 1;
            async move {
                if batch[0] == "s5" {
                    Err("auth expired")
                } else {
                    Ok(batch)
                }
            }
        })
        .await;

        assert_eq!(result, Err("auth expired"));
        assert_eq!(*calls.lock().unwrap(), 2);
    }
}
