//! Calling tiers example for tenq-dispatch
//!
//! This example demonstrates:
//! - Registering named tensors and constants
//! - Chaining operations with named and auto outputs
//! - Immediate-tier evaluation with value operands
//! - How chain failures are reported

use tenq_core::Tensor;
use tenq_dispatch::{init_tracing, Call, Dispatcher, DispatcherConfig, TracingConfig};
use tenq_exec::{AxisSel, ConvParams, Reduction};

fn main() -> anyhow::Result<()> {
    init_tracing(TracingConfig::from_env())?;

    println!("TenQ Dispatcher - Calling Tiers Example");
    println!("=======================================\n");

    let mut tq = Dispatcher::with_config(DispatcherConfig::from_env()?);
    println!("{}\n", tq.status());

    // Example 1: Chain tier
    println!("1. Chain Tier");
    println!("-------------");

    tq.put("x", Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3])?)?;
    tq.put("w", Tensor::from_vec(vec![0.5, -1.0, 1.5, 0.0, 2.0, 1.0], &[3, 2])?)?;
    tq.register("b", Tensor::vector(&[0.1, -0.1]), 1, true)?;

    tq.run(Call::affine("x", "w", "b"), "")
        .run(Call::relu(""), "")
        .run(Call::softmax(""), "probs");
    let probs = tq.retrieve("probs")?;
    println!("softmax(relu(x·w + b)) = {:?}\n", probs.data());

    // Example 2: Immediate tier with value operands
    println!("2. Immediate Tier");
    println!("-----------------");

    let m = Tensor::from_vec(vec![3.0, 1.0, 4.0, 1.0, 5.0, 9.0], &[2, 3])?;
    let total = tq.eval(Call::sum(m.clone(), Reduction::All))?;
    let column = tq.eval(Call::sum(m.clone(), Reduction::Along(0)))?;
    let running = tq.eval(Call::accumulate(m.clone(), AxisSel::First))?;
    let winner = tq.eval(Call::argmax(m, AxisSel::At(1)))?;
    println!("sum          = {:?}", total.item());
    println!("sum axis 0   = {:?}", column.data());
    println!("cumsum axis 0 = {:?}", running.data());
    println!("argmax axis 1 = {:?}\n", winner.data());

    // Example 3: Convolution lowering round trip
    println!("3. Convolution Lowering");
    println!("-----------------------");

    let signal = Tensor::from_vec((0..8u32).map(f64::from).collect(), &[1, 1, 8])?;
    let kernel = Tensor::ones(&[2, 1, 3]);
    let params = ConvParams::symmetric(1, 1);
    let cols = tq.eval(Call::lower_1d(signal.clone(), kernel.clone(), params))?;
    println!("lowered shape = {:?}", cols.shape());
    let back = tq.eval(Call::unlower_1d(cols, kernel, params, None))?;
    println!("round trip exact = {}\n", back.bit_eq(&signal));

    // Example 4: Failure reporting
    println!("4. Failure Reporting");
    println!("--------------------");

    tq.put("a", Tensor::ones(&[2, 3]))?;
    tq.matmul("a", "a", "aa");
    if let Some(err) = tq.last_error() {
        println!("last error: {}", err);
    }
    println!("failures so far: {}", tq.failure_count());
    println!("'a' still live: {}", tq.entry("a").is_some());

    Ok(())
}
