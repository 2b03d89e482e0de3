use threshold_pre::keeper::{FragmentKeeper, MemoryKeeper};
use threshold_pre::*;

fn main() {
    let params = new_standard_params();
    let alice = KeyPair::random(&params);
    let signer = Signer::random(&params);
    let bob = KeyPair::random(&params);

    let plaintext = b"Hello, proxy re-encryption!".to_vec();
    let (capsule, ciphertext) = encrypt(alice.public_key(), &plaintext).unwrap();

    // Owner path: Alice decrypts her own ciphertext directly.
    let direct = decrypt_original(alice.private_key(), &capsule, &ciphertext).unwrap();
    assert_eq!(direct, plaintext);

    // Delegation: split towards Bob and park the fragments with the keeper.
    let threshold = 1;
    let shares = 2;
    let kfrags = generate_kfrags(&alice, bob.public_key(), &signer, threshold, shares).unwrap();

    let mut keeper = MemoryKeeper::open();
    for (i, kfrag) in kfrags.iter().enumerate() {
        let requestor = format!("proxy-{}", i + 1);
        let text = transport::encode(&kfrag.to_bytes());
        keeper
            .store("file-1", &requestor, text.into_bytes())
            .unwrap();
    }

    // Proxy path: fetch a fragment, verify it, transform the capsule.
    let stored = keeper.fetch("file-1", "proxy-1").unwrap();
    let kfrag_bytes = transport::decode(&String::from_utf8(stored).unwrap()).unwrap();
    let kfrag = KeyFrag::from_bytes(&kfrag_bytes, &params).unwrap();
    let verified_kfrag = kfrag
        .verify(
            signer.public_key(),
            Some(alice.public_key()),
            Some(bob.public_key()),
        )
        .unwrap();
    let cfrag = reencrypt(&capsule, &verified_kfrag).unwrap();

    // Delegatee path: verify the fragment and combine.
    let verified_cfrag = cfrag
        .verify(
            &capsule,
            alice.public_key(),
            bob.public_key(),
            signer.public_key(),
        )
        .unwrap();
    let delegated = decrypt_reencrypted(
        bob.private_key(),
        alice.public_key(),
        &capsule,
        &[verified_cfrag],
        &ciphertext,
    )
    .unwrap();
    assert_eq!(delegated, plaintext);

    println!("{}", String::from_utf8(delegated).unwrap());
}
