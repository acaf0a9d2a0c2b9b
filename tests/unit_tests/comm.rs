use polyxtal::comm::{run_threaded, Communicator, ExecutionContext, ThreadCommunicator};

#[test]
fn serial_context_is_root_of_one() {
    let ctx = ExecutionContext::serial();
    assert_eq!(ctx.rank(), 0);
    assert_eq!(ctx.size(), 1);
    assert!(ctx.is_root());

    let mut values = [1.0, 2.0];
    ctx.all_reduce_sum(&mut values);
    assert_eq!(values, [1.0, 2.0]);
    assert!(ctx.any(true));
    assert!(!ctx.any(false));
}

#[test]
fn run_threaded_returns_results_by_rank() {
    let results = run_threaded(4, |ctx| (ctx.rank(), ctx.size()));
    assert_eq!(results, vec![(0, 4), (1, 4), (2, 4), (3, 4)]);
}

#[test]
fn threaded_all_reduce_sums_over_ranks() {
    let results = run_threaded(3, |ctx| {
        let rank = ctx.rank() as f64;
        let mut values = vec![1.0, rank, rank * rank];
        ctx.all_reduce_sum(&mut values);
        values
    });
    for values in results {
        assert_eq!(values, vec![3.0, 3.0, 5.0]);
    }
}

#[test]
fn repeated_collectives_do_not_mix_buffers() {
    let results = run_threaded(4, |ctx| {
        (0..20)
            .map(|round| ctx.all_reduce_sum_scalar((ctx.rank() * round) as f64))
            .collect::<Vec<_>>()
    });
    let expected: Vec<f64> = (0..20).map(|round| (6 * round) as f64).collect();
    for values in results {
        assert_eq!(values, expected);
    }
}

#[test]
fn any_is_true_on_every_rank_if_one_rank_flags() {
    let results = run_threaded(3, |ctx| ctx.any(ctx.rank() == 2));
    assert_eq!(results, vec![true, true, true]);
    let results = run_threaded(3, |ctx| ctx.any(false));
    assert_eq!(results, vec![false, false, false]);
}

#[test]
fn agree_fails_every_rank_if_one_rank_fails() {
    let results = run_threaded(3, |ctx| {
        let local = if ctx.rank() == 1 { Err("local") } else { Ok(ctx.rank()) };
        ctx.agree(local, || "peer")
    });
    assert_eq!(results, vec![Err("peer"), Err("local"), Err("peer")]);

    let results = run_threaded(3, |ctx| ctx.agree(Ok::<_, &str>(ctx.rank()), || "peer"));
    assert_eq!(results, vec![Ok(0), Ok(1), Ok(2)]);
}

#[test]
fn thread_group_communicators_are_ordered_by_rank() {
    let group = ThreadCommunicator::group(3);
    let ranks: Vec<_> = group.iter().map(|comm| comm.rank()).collect();
    assert_eq!(ranks, vec![0, 1, 2]);
    assert!(group.iter().all(|comm| comm.size() == 3));
}
