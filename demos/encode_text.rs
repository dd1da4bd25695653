use huffman::{huffman, CodeTable};

fn main() -> huffman::Result<()> {
    let s = String::from("Hello my name is Sam!");
    let tree = huffman(s.chars())?;

    for (sym, code) in CodeTable::from_tree(&tree).iter() {
        println!("{sym:?} {code:b}");
    }

    let (e, d) = tree.into_encoder_decoder_pair();
    let out = e.encode(s.chars())?;
    let dec: String = d.decode(&out, s.chars().count())?.into_iter().collect();

    println!("{} bits: {:?}", out.len(), dec);
    Ok(())
}
