use hlsfuzz::driver;
use hlsfuzz_utils::FuzzResult;

fn main() -> FuzzResult<()> {
    driver::run_fuzzer()
}
