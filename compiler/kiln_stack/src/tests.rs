use super::ensure_sufficient_stack;

#[derive(Debug)]
enum Chain {
    Link(Box<Chain>),
    End,
}

fn build(depth: usize) -> Chain {
    let mut chain = Chain::End;
    for _ in 0..depth {
        chain = Chain::Link(Box::new(chain));
    }
    chain
}

fn measure(chain: &Chain) -> usize {
    ensure_sufficient_stack(|| match chain {
        Chain::Link(inner) => measure(inner) + 1,
        Chain::End => 0,
    })
}

fn dismantle(chain: Chain) {
    // Iterative drop so the test itself does not overflow in the destructor.
    let mut current = chain;
    while let Chain::Link(inner) = current {
        current = *inner;
    }
}

#[test]
fn shallow_walk() {
    let chain = build(16);
    assert_eq!(measure(&chain), 16);
    dismantle(chain);
}

#[test]
fn deep_walk_grows_stack() {
    let chain = build(200_000);
    assert_eq!(measure(&chain), 200_000);
    dismantle(chain);
}

#[test]
fn passes_result_through() {
    let value: Result<u8, String> = ensure_sufficient_stack(|| Ok(7));
    assert_eq!(value, Ok(7));
}
